//! 图片获取服务 - 业务能力层
//!
//! 只负责"把图片引用变成字节"，不解码、不缩放
//!
//! 支持的来源：
//! - `http://` / `https://` 远程图片
//! - `data:<mime>;base64,<payload>` 内联图片
//! - `file://<path>` 或普通路径的本地图片

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::{FetchError, VisionResult};
use crate::models::{FetchedImage, ImageRef, ImageSource};
use crate::services::vision_info::ImageFetcher;
use crate::utils::truncate_text;

/// 图片来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Url(String),
    DataUrl(String),
    File(PathBuf),
}

impl MediaSource {
    /// 从原始字符串识别来源
    pub fn parse(raw: &str) -> Result<Self, FetchError> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Ok(MediaSource::Url(raw.to_string()))
        } else if raw.starts_with("data:") {
            Ok(MediaSource::DataUrl(raw.to_string()))
        } else if let Some(path) = raw.strip_prefix("file://") {
            Ok(MediaSource::File(PathBuf::from(path)))
        } else if raw.is_empty() {
            Err(FetchError::UnsupportedSource(String::new()))
        } else {
            Ok(MediaSource::File(PathBuf::from(raw)))
        }
    }

    /// 从图片引用中取出来源字符串
    ///
    /// 优先 `image` 字段，其次 `image_url`（字符串或带 `url` 的对象）。
    pub fn from_ref(image_ref: ImageRef<'_>) -> Result<Self, FetchError> {
        let value = image_ref
            .get("image")
            .or_else(|| image_ref.get("image_url"))
            .ok_or(FetchError::MissingSource)?;

        match value {
            Value::String(raw) => Self::parse(raw),
            Value::Object(obj) => match obj.get("url").and_then(Value::as_str) {
                Some(raw) => Self::parse(raw),
                None => Err(FetchError::UnsupportedSource(value.to_string())),
            },
            other => Err(FetchError::UnsupportedSource(other.to_string())),
        }
    }
}

/// 图片获取服务
#[derive(Clone)]
pub struct MediaFetcher {
    client: Client,
    allowed_domains: Option<HashSet<String>>,
    allowed_local_media_path: Option<PathBuf>,
    fetch_timeout: Duration,
}

impl MediaFetcher {
    /// 创建新的图片获取服务
    ///
    /// 超时为 0 时关闭客户端自带的默认超时。
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let timeout = config.fetch_timeout();
        let client = Client::builder()
            .timeout((timeout > Duration::ZERO).then_some(timeout))
            .build()?;
        Self::with_client(client, config)
    }

    /// 使用已有的 HTTP 客户端创建
    pub fn with_client(client: Client, config: &Config) -> Result<Self, FetchError> {
        let allowed_domains = config.allowed_domains.as_ref().map(|domains| {
            domains
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect::<HashSet<_>>()
        });

        let allowed_local_media_path = match &config.allowed_local_media_path {
            Some(path) => Some(std::fs::canonicalize(path)?),
            None => None,
        };

        Ok(Self {
            client,
            allowed_domains,
            allowed_local_media_path,
            fetch_timeout: config.fetch_timeout(),
        })
    }

    /// 按来源获取图片
    pub fn fetch_source(&self, source: MediaSource) -> Result<FetchedImage, FetchError> {
        match source {
            MediaSource::Url(url) => self.fetch_http_image(&url),
            MediaSource::DataUrl(data_url) => decode_data_url(&data_url),
            MediaSource::File(path) => self.fetch_file(&path),
        }
    }

    fn fetch_http_image(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        self.ensure_domain_allowed(&parsed)?;

        let mut req = self.client.get(parsed.as_str());
        if self.fetch_timeout > Duration::ZERO {
            req = req.timeout(self.fetch_timeout);
        }

        let resp = req.send().map_err(|err| {
            if err.is_timeout() && self.fetch_timeout > Duration::ZERO {
                FetchError::Timeout(self.fetch_timeout)
            } else {
                FetchError::Http(err)
            }
        })?;

        let resp = resp.error_for_status()?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes()?;

        Ok(FetchedImage::new(
            bytes.to_vec(),
            content_type,
            ImageSource::Url {
                url: parsed.to_string(),
            },
        ))
    }

    fn fetch_file(&self, path: &Path) -> Result<FetchedImage, FetchError> {
        let canonical = std::fs::canonicalize(path)?;
        if let Some(allowed_root) = &self.allowed_local_media_path {
            if !canonical.starts_with(allowed_root) {
                warn!("拒绝读取允许目录之外的图片: {}", path.display());
                return Err(FetchError::DisallowedLocalPath(path.display().to_string()));
            }
        }

        let bytes = std::fs::read(&canonical)?;
        let content_type = guess_content_type(&canonical).map(str::to_string);

        Ok(FetchedImage::new(
            bytes,
            content_type,
            ImageSource::File { path: canonical },
        ))
    }

    fn ensure_domain_allowed(&self, url: &Url) -> Result<(), FetchError> {
        if let Some(allowed) = &self.allowed_domains {
            let host = url
                .host_str()
                .map(|h| h.to_ascii_lowercase())
                .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?;
            if !allowed.contains(&host) {
                return Err(FetchError::DisallowedDomain(host));
            }
        }
        Ok(())
    }
}

impl ImageFetcher for MediaFetcher {
    type Image = FetchedImage;

    fn fetch(&self, image_ref: ImageRef<'_>) -> VisionResult<FetchedImage> {
        let source = MediaSource::from_ref(image_ref)?;
        debug!("获取图片: {}", truncate_text(&format!("{:?}", source), 80));
        Ok(self.fetch_source(source)?)
    }
}

/// 解码 base64 data URL
fn decode_data_url(data_url: &str) -> Result<FetchedImage, FetchError> {
    let (metadata, data) = data_url
        .split_once(',')
        .ok_or_else(|| FetchError::DataUrl("data URL 缺少逗号分隔符".into()))?;

    let Some(mime) = metadata
        .strip_prefix("data:")
        .and_then(|m| m.strip_suffix(";base64"))
    else {
        return Err(FetchError::DataUrl("只支持 base64 编码的 data URL".into()));
    };

    let payload: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = BASE64_STANDARD.decode(payload)?;
    let content_type = (!mime.is_empty()).then(|| mime.to_string());

    Ok(FetchedImage::new(bytes, content_type, ImageSource::DataUrl))
}

fn guess_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}
