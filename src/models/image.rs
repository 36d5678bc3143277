use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 图片引用：示例的 `input` 或消息中的图片内容块
///
/// 只借用原始对象，不做任何修改。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRef<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> ImageRef<'a> {
    pub fn new(fields: &'a Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }

    pub fn as_map(&self) -> &'a Map<String, Value> {
        self.fields
    }
}

impl fmt::Display for ImageRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.fields.clone()))
    }
}

/// 图片来源（用于日志和追踪）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageSource {
    Url { url: String },
    DataUrl,
    File { path: PathBuf },
}

/// 已获取的图片
///
/// 只保存原始字节，解码和缩放由下游推理引擎负责。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    bytes: Vec<u8>,
    content_type: Option<String>,
    source: ImageSource,
}

impl FetchedImage {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>, source: ImageSource) -> Self {
        Self {
            bytes,
            content_type,
            source,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn source(&self) -> &ImageSource {
        &self.source
    }
}

/// 视觉信息提取结果
///
/// 空列表统一表示为 `None`。
#[derive(Debug, Clone, PartialEq)]
pub struct VisionInfo<I> {
    pub images: Option<Vec<I>>,
    /// 视频内容块，原样保留，不做获取
    pub videos: Option<Vec<Value>>,
}

impl<I> VisionInfo<I> {
    pub fn new(images: Vec<I>, videos: Vec<Value>) -> Self {
        Self {
            images: (!images.is_empty()).then_some(images),
            videos: (!videos.is_empty()).then_some(videos),
        }
    }

    pub fn from_images(images: Vec<I>) -> Self {
        Self::new(images, Vec::new())
    }
}

impl<I> Default for VisionInfo<I> {
    fn default() -> Self {
        Self {
            images: None,
            videos: None,
        }
    }
}
