//! 图片整理流程
//!
//! 把"上下文示例"和"消息"中的图片整理成一个扁平的有序列表：
//!
//! ```text
//! 第 0 项示例图片, 第 0 项消息图片, 第 1 项示例图片, 第 1 项消息图片, ...
//! ```
//!
//! 示例图片按记录顺序，消息图片按提取器返回的顺序。

use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{VisionError, VisionResult};
use crate::models::{Batched, ExampleGroup, ExampleInput, MessageInput};
use crate::services::{ContentPartExtractor, ImageFetcher, MediaFetcher, VisionInfoExtractor};

/// 示例与消息批次的配对方式
///
/// 在进入逐项处理之前一次性确定。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExamplePairing<'a> {
    /// 没有示例
    Absent,
    /// 一个示例组对应唯一的消息组
    Broadcast(&'a ExampleGroup),
    /// 示例组与消息组逐项对应
    PerItem(&'a [Option<ExampleGroup>]),
}

impl<'a> ExamplePairing<'a> {
    /// 根据输入形状确定配对方式
    ///
    /// 长度不一致时只允许一种情况：单项消息配一个示例组。
    pub fn resolve(messages: &MessageInput, examples: &'a ExampleInput) -> VisionResult<Self> {
        let message_len = messages.len();

        match examples {
            ExampleInput::Absent => Ok(Self::Absent),
            ExampleInput::Group(group) if group.is_empty() => Ok(Self::Absent),
            ExampleInput::Batch(items) if items.is_empty() => Ok(Self::Absent),
            ExampleInput::Group(group) => match messages {
                Batched::Single(_) => Ok(Self::Broadcast(group)),
                Batched::Batch(_) if message_len == 1 => Ok(Self::Broadcast(group)),
                Batched::Batch(_) => Err(VisionError::batch_length_mismatch(1, message_len)),
            },
            ExampleInput::Batch(items) if items.len() == message_len => Ok(Self::PerItem(items)),
            ExampleInput::Batch(items) => Err(VisionError::batch_length_mismatch(
                items.len(),
                message_len,
            )),
        }
    }

    /// 第 `index` 项对应的示例组
    pub fn group_for(&self, index: usize) -> Option<&'a ExampleGroup> {
        match *self {
            Self::Absent => None,
            Self::Broadcast(group) => (index == 0).then_some(group),
            Self::PerItem(items) => items.get(index).and_then(Option::as_ref),
        }
    }
}

/// 图片整理器
///
/// 持有两个协作者：
/// - `extractor`：从消息组中提取图片
/// - `fetcher`：获取示例中的图片
pub struct ImageOrderer<X, F> {
    extractor: X,
    fetcher: F,
}

/// 使用默认协作者的整理器
pub type DefaultImageOrderer = ImageOrderer<ContentPartExtractor<MediaFetcher>, MediaFetcher>;

impl DefaultImageOrderer {
    /// 按配置创建默认整理器
    pub fn from_config(config: &Config) -> VisionResult<Self> {
        let fetcher = MediaFetcher::new(config)?;
        info!("图片整理器已创建，获取超时: {:?}", config.fetch_timeout());
        Ok(Self::new(ContentPartExtractor::new(fetcher.clone()), fetcher))
    }
}

impl<X, F> ImageOrderer<X, F>
where
    X: VisionInfoExtractor,
    F: ImageFetcher<Image = X::Image>,
{
    pub fn new(extractor: X, fetcher: F) -> Self {
        Self { extractor, fetcher }
    }

    /// 整理所有图片
    ///
    /// # 参数
    /// - `messages`: 单个消息组或一批消息组
    /// - `examples`: 示例输入，可以没有
    ///
    /// # 返回
    /// 有图片时返回有序列表，一张都没有时返回 `None`
    ///
    /// # 错误
    /// 示例批次与消息批次长度不一致时返回 `BatchLengthMismatch`；
    /// 协作者的错误原样向上传递
    pub fn order_images(
        &self,
        messages: &MessageInput,
        examples: &ExampleInput,
    ) -> VisionResult<Option<Vec<X::Image>>> {
        let pairing = ExamplePairing::resolve(messages, examples)?;

        let mut all_images = Vec::new();
        for (index, message_group) in messages.items().iter().enumerate() {
            if let Some(example_group) = pairing.group_for(index) {
                let example_images = self.extract_example_images(example_group)?;
                debug!("第 {} 项示例图片: {} 张", index, example_images.len());
                all_images.extend(example_images);
            }

            let message_images = self
                .extractor
                .extract(message_group)?
                .images
                .unwrap_or_default();
            debug!("第 {} 项消息图片: {} 张", index, message_images.len());
            all_images.extend(message_images);
        }

        debug!(
            "图片整理完成: {} 项, 共 {} 张",
            messages.len(),
            all_images.len()
        );

        Ok((!all_images.is_empty()).then_some(all_images))
    }

    /// 从 JSON 输入整理图片
    ///
    /// 先按 `MessageInput::from_json` / `ExampleInput::from_json` 解析形状，再整理。
    pub fn order_json(
        &self,
        messages: Value,
        examples: Option<Value>,
    ) -> VisionResult<Option<Vec<X::Image>>> {
        let messages = MessageInput::from_json(messages)?;
        let examples = ExampleInput::from_json(examples);
        self.order_images(&messages, &examples)
    }

    fn extract_example_images(&self, group: &ExampleGroup) -> VisionResult<Vec<X::Image>> {
        group
            .image_refs()
            .map(|image_ref| self.fetcher.fetch(image_ref))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::models::{ImageRef, MessageGroup, VisionInfo};
    use serde_json::json;
    use std::cell::Cell;

    /// 返回引用中的 image 字段，并记录调用次数
    #[derive(Default)]
    struct StubFetcher {
        calls: Cell<usize>,
    }

    impl ImageFetcher for StubFetcher {
        type Image = String;

        fn fetch(&self, image_ref: ImageRef<'_>) -> VisionResult<String> {
            self.calls.set(self.calls.get() + 1);
            image_ref
                .get("image")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| FetchError::MissingSource.into())
        }
    }

    /// 每条消息的 `img` 字段即为一张图片
    #[derive(Default)]
    struct StubExtractor {
        calls: Cell<usize>,
    }

    impl VisionInfoExtractor for StubExtractor {
        type Image = String;

        fn extract(&self, messages: &[Value]) -> VisionResult<VisionInfo<String>> {
            self.calls.set(self.calls.get() + 1);
            let images = messages
                .iter()
                .filter_map(|m| m.get("img").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            Ok(VisionInfo::from_images(images))
        }
    }

    fn orderer() -> ImageOrderer<StubExtractor, StubFetcher> {
        ImageOrderer::new(StubExtractor::default(), StubFetcher::default())
    }

    fn group(images: &[&str]) -> MessageGroup {
        images.iter().map(|img| json!({"role": "user", "img": img})).collect()
    }

    fn example(image: &str) -> Value {
        json!({"input": {"type": "image", "image": image}, "output": "{}"})
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_without_examples() {
        let result = orderer()
            .order_images(&Batched::Single(group(&["a", "b"])), &ExampleInput::Absent)
            .unwrap();
        assert_eq!(result, Some(strings(&["a", "b"])));
    }

    #[test]
    fn test_single_with_example_group() {
        let examples = ExampleInput::Group(ExampleGroup::new(vec![example("e")]));
        let result = orderer()
            .order_images(&Batched::Single(group(&["a"])), &examples)
            .unwrap();
        assert_eq!(result, Some(strings(&["e", "a"])));
    }

    #[test]
    fn test_batch_without_examples_concatenates() {
        let messages = Batched::Batch(vec![group(&["a"]), group(&["b"])]);
        let result = orderer()
            .order_images(&messages, &ExampleInput::Absent)
            .unwrap();
        assert_eq!(result, Some(strings(&["a", "b"])));
    }

    #[test]
    fn test_batch_with_examples_per_item() {
        let messages = Batched::Batch(vec![group(&["a"]), group(&["b"])]);
        let examples = ExampleInput::Batch(vec![
            Some(ExampleGroup::new(vec![example("e0")])),
            Some(ExampleGroup::default()),
        ]);
        let result = orderer().order_images(&messages, &examples).unwrap();
        assert_eq!(result, Some(strings(&["e0", "a", "b"])));
    }

    #[test]
    fn test_batch_with_none_entry() {
        let messages = Batched::Batch(vec![group(&["a"]), group(&["b"])]);
        let examples = ExampleInput::Batch(vec![None, Some(ExampleGroup::single(example("e1")))]);
        let result = orderer().order_images(&messages, &examples).unwrap();
        assert_eq!(result, Some(strings(&["a", "e1", "b"])));
    }

    #[test]
    fn test_batch_length_mismatch() {
        let messages = Batched::Batch(vec![group(&["a"]), group(&["b"]), group(&["c"])]);
        let examples = ExampleInput::Batch(vec![None, None]);
        let orderer = orderer();

        let result = orderer.order_images(&messages, &examples);

        assert!(matches!(
            result,
            Err(VisionError::BatchLengthMismatch {
                examples: 2,
                messages: 3
            })
        ));
        assert_eq!(orderer.extractor.calls.get(), 0);
    }

    #[test]
    fn test_single_messages_with_longer_example_batch_fails() {
        let examples = ExampleInput::Batch(vec![None, None]);
        let result = orderer().order_images(&Batched::Single(group(&["a"])), &examples);
        assert!(matches!(
            result,
            Err(VisionError::BatchLengthMismatch {
                examples: 2,
                messages: 1
            })
        ));
    }

    #[test]
    fn test_group_broadcast_only_to_single_item() {
        let examples = ExampleInput::Group(ExampleGroup::single(example("e")));

        let one = Batched::Batch(vec![group(&["a"])]);
        assert_eq!(
            orderer().order_images(&one, &examples).unwrap(),
            Some(strings(&["e", "a"]))
        );

        let two = Batched::Batch(vec![group(&["a"]), group(&["b"])]);
        assert!(matches!(
            orderer().order_images(&two, &examples),
            Err(VisionError::BatchLengthMismatch {
                examples: 1,
                messages: 2
            })
        ));
    }

    #[test]
    fn test_empty_examples_are_absent() {
        let messages = Batched::Batch(vec![group(&["a"]), group(&["b"])]);
        for examples in [
            ExampleInput::Group(ExampleGroup::default()),
            ExampleInput::Batch(vec![]),
        ] {
            let result = orderer().order_images(&messages, &examples).unwrap();
            assert_eq!(result, Some(strings(&["a", "b"])));
        }
    }

    #[test]
    fn test_no_images_returns_none() {
        let orderer = orderer();
        let result = orderer
            .order_images(&Batched::Single(vec![]), &ExampleInput::Absent)
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(orderer.extractor.calls.get(), 1);
    }

    #[test]
    fn test_malformed_examples_contribute_nothing() {
        let examples = ExampleInput::Group(ExampleGroup::new(vec![
            json!({"output": "no input"}),
            json!({"input": "just text"}),
            json!({"input": {"type": "text", "text": "hello"}}),
        ]));
        let orderer = orderer();

        let result = orderer
            .order_images(&Batched::Single(group(&[])), &examples)
            .unwrap();

        assert_eq!(result, None);
        assert_eq!(orderer.fetcher.calls.get(), 0);
    }

    #[test]
    fn test_fetch_once_per_image_record() {
        let examples = ExampleInput::Group(ExampleGroup::new(vec![
            example("e0"),
            json!({"input": "skip"}),
            example("e1"),
        ]));
        let orderer = orderer();

        let result = orderer
            .order_images(&Batched::Single(group(&["a"])), &examples)
            .unwrap();

        assert_eq!(result, Some(strings(&["e0", "e1", "a"])));
        assert_eq!(orderer.fetcher.calls.get(), 2);
        assert_eq!(orderer.extractor.calls.get(), 1);
    }

    #[test]
    fn test_fetch_error_propagates() {
        let examples = ExampleInput::Group(ExampleGroup::single(
            json!({"input": {"type": "image"}}),
        ));
        let result = orderer().order_images(&Batched::Single(group(&["a"])), &examples);
        assert!(matches!(
            result,
            Err(VisionError::Fetch(FetchError::MissingSource))
        ));
    }

    #[test]
    fn test_order_json_detects_shapes() {
        let messages = json!([
            [{"role": "user", "img": "a"}],
            [{"role": "user", "img": "b"}]
        ]);
        let examples = json!([[example("e0")], null]);

        let result = orderer().order_json(messages, Some(examples)).unwrap();

        assert_eq!(result, Some(strings(&["e0", "a", "b"])));
    }

    #[test]
    fn test_order_json_single_record_example() {
        let messages = json!([{"role": "user", "img": "a"}]);
        let result = orderer()
            .order_json(messages, Some(example("e")))
            .unwrap();
        assert_eq!(result, Some(strings(&["e", "a"])));
    }
}
