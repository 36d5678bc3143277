use std::path::PathBuf;
use std::time::Duration;

/// 图片获取配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 单张图片获取超时（秒），0 表示不限制
    pub fetch_timeout_secs: u64,
    /// 允许访问的域名（为空表示不限制）
    pub allowed_domains: Option<Vec<String>>,
    /// 允许读取的本地目录（为空表示不限制）
    pub allowed_local_media_path: Option<PathBuf>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 10,
            allowed_domains: None,
            allowed_local_media_path: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            fetch_timeout_secs: std::env::var("IMAGE_FETCH_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.fetch_timeout_secs),
            allowed_domains: std::env::var("IMAGE_ALLOWED_DOMAINS").ok().map(|v| parse_domains(&v)).filter(|d| !d.is_empty()).or(default.allowed_domains),
            allowed_local_media_path: std::env::var("IMAGE_LOCAL_MEDIA_PATH").ok().filter(|v| !v.is_empty()).map(PathBuf::from).or(default.allowed_local_media_path),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 获取超时时间
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// 解析逗号分隔的域名列表
fn parse_domains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}
