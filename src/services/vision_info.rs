//! 视觉信息提取 - 业务能力层
//!
//! 定义两个协作者接口：
//! - `ImageFetcher`：把一个图片引用解析成具体图片
//! - `VisionInfoExtractor`：从一个消息组中提取图片（和视频）
//!
//! `ContentPartExtractor` 是默认的提取器，扫描消息的 `content` 内容块。

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{VisionError, VisionResult};
use crate::models::{ImageRef, VisionInfo};

/// 图片获取能力
pub trait ImageFetcher {
    type Image;

    /// 获取单张图片
    fn fetch(&self, image_ref: ImageRef<'_>) -> VisionResult<Self::Image>;
}

impl<T: ImageFetcher + ?Sized> ImageFetcher for &T {
    type Image = T::Image;

    fn fetch(&self, image_ref: ImageRef<'_>) -> VisionResult<Self::Image> {
        (**self).fetch(image_ref)
    }
}

/// 视觉信息提取能力
pub trait VisionInfoExtractor {
    type Image;

    /// 从一个消息组中提取视觉信息
    fn extract(&self, messages: &[Value]) -> VisionResult<VisionInfo<Self::Image>>;
}

impl<T: VisionInfoExtractor + ?Sized> VisionInfoExtractor for &T {
    type Image = T::Image;

    fn extract(&self, messages: &[Value]) -> VisionResult<VisionInfo<Self::Image>> {
        (**self).extract(messages)
    }
}

const VISION_KEYS: [&str; 3] = ["image", "image_url", "video"];

/// 默认提取器
///
/// 职责：
/// - 按消息顺序、内容块顺序找出视觉内容块
/// - 图片块交给 `ImageFetcher` 获取
/// - 视频块原样保留
pub struct ContentPartExtractor<F> {
    fetcher: F,
}

impl<F: ImageFetcher> ContentPartExtractor<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

impl<F: ImageFetcher> VisionInfoExtractor for ContentPartExtractor<F> {
    type Image = F::Image;

    fn extract(&self, messages: &[Value]) -> VisionResult<VisionInfo<F::Image>> {
        let mut images = Vec::new();
        let mut videos = Vec::new();

        for part in vision_parts(messages) {
            if part.contains_key("image") || part.contains_key("image_url") {
                images.push(self.fetcher.fetch(ImageRef::new(part))?);
            } else if part.contains_key("video") {
                videos.push(Value::Object(part.clone()));
            } else {
                return Err(VisionError::invalid_input(format!(
                    "视觉内容块缺少 image、image_url 或 video 字段: {}",
                    Value::Object(part.clone())
                )));
            }
        }

        debug!(
            "消息组提取完成: {} 张图片, {} 段视频",
            images.len(),
            videos.len()
        );

        Ok(VisionInfo::new(images, videos))
    }
}

/// 按顺序返回所有视觉内容块
///
/// 字符串形式的 `content` 不含视觉内容。
fn vision_parts(messages: &[Value]) -> impl Iterator<Item = &Map<String, Value>> {
    messages
        .iter()
        .filter_map(|message| message.get("content").and_then(Value::as_array))
        .flatten()
        .filter_map(Value::as_object)
        .filter(|part| is_vision_part(part))
}

fn is_vision_part(part: &Map<String, Value>) -> bool {
    VISION_KEYS.iter().any(|key| part.contains_key(*key))
        || part
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| VISION_KEYS.contains(&t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// 返回 image / image_url 字段的字符串形式
    struct EchoFetcher;

    impl ImageFetcher for EchoFetcher {
        type Image = String;

        fn fetch(&self, image_ref: ImageRef<'_>) -> VisionResult<String> {
            let value = image_ref
                .get("image")
                .or_else(|| image_ref.get("image_url"))
                .ok_or(crate::error::FetchError::MissingSource)?;
            Ok(value.as_str().map_or_else(|| value.to_string(), str::to_string))
        }
    }

    #[test]
    fn test_extract_in_message_order() {
        let messages = vec![
            json!({"role": "system", "content": "你是一个信息抽取助手"}),
            json!({"role": "user", "content": [
                {"type": "image", "image": "a.png"},
                {"type": "text", "text": "抽取信息"},
                {"type": "image_url", "image_url": "b.png"},
            ]}),
            json!({"role": "user", "content": [{"type": "image", "image": "c.png"}]}),
        ];

        let info = ContentPartExtractor::new(EchoFetcher).extract(&messages).unwrap();

        assert_eq!(info.images, Some(vec!["a.png".into(), "b.png".into(), "c.png".into()]));
        assert!(info.videos.is_none());
    }

    #[test]
    fn test_extract_videos_are_not_fetched() {
        let messages = vec![json!({"role": "user", "content": [
            {"type": "video", "video": "clip.mp4"},
        ]})];

        let info = ContentPartExtractor::new(EchoFetcher).extract(&messages).unwrap();

        assert!(info.images.is_none());
        assert_eq!(info.videos.unwrap().len(), 1);
    }

    #[test]
    fn test_extract_empty_group() {
        let info = ContentPartExtractor::new(EchoFetcher).extract(&[]).unwrap();
        assert_eq!(info, VisionInfo::default());
    }

    #[test]
    fn test_typed_part_without_source_fails() {
        let messages = vec![json!({"role": "user", "content": [{"type": "image"}]})];

        let result = ContentPartExtractor::new(EchoFetcher).extract(&messages);

        assert!(matches!(result, Err(VisionError::InvalidInput(_))));
    }
}
