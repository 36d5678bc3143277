//! 输入形状
//!
//! 消息和示例在调用边界上一次性解析为显式的枚举，
//! 之后的流程不再检查"是列表还是单项"。

use serde_json::{Map, Value};

use crate::error::{VisionError, VisionResult};
use crate::models::image::ImageRef;

/// 消息组：一次对话的有序消息列表，原样交给视觉信息提取器
pub type MessageGroup = Vec<Value>;

/// 单项或批量输入
#[derive(Debug, Clone, PartialEq)]
pub enum Batched<T> {
    Single(T),
    Batch(Vec<T>),
}

impl<T> Batched<T> {
    pub fn is_batch(&self) -> bool {
        matches!(self, Batched::Batch(_))
    }

    /// 归一化后的批次长度，单项视为长度 1
    pub fn len(&self) -> usize {
        match self {
            Batched::Single(_) => 1,
            Batched::Batch(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 以批次形式访问所有项
    pub fn items(&self) -> &[T] {
        match self {
            Batched::Single(item) => std::slice::from_ref(item),
            Batched::Batch(items) => items,
        }
    }
}

/// 消息输入
pub type MessageInput = Batched<MessageGroup>;

impl Batched<MessageGroup> {
    /// 从 JSON 解析消息输入
    ///
    /// 第一个元素是数组时视为批量输入，否则整个数组是一个消息组。
    /// 空数组视为一个空的消息组。
    pub fn from_json(value: Value) -> VisionResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(VisionError::invalid_input(format!(
                    "messages 必须是数组: {}",
                    other
                )))
            }
        };

        if !matches!(items.first(), Some(Value::Array(_))) {
            return Ok(Batched::Single(items));
        }

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Array(group) => Ok(group),
                other => Err(VisionError::invalid_input(format!(
                    "批量消息第 {} 项不是数组: {}",
                    index, other
                ))),
            })
            .collect::<VisionResult<Vec<_>>>()
            .map(Batched::Batch)
    }
}

/// 示例组：一组上下文示例记录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleGroup {
    records: Vec<Value>,
}

impl ExampleGroup {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// 单条示例记录
    pub fn single(record: Value) -> Self {
        Self {
            records: vec![record],
        }
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 按记录顺序返回所有图片类型的 `input`
    ///
    /// `input` 缺失、不是对象或 `type` 不是 `"image"` 的记录直接跳过。
    pub fn image_refs(&self) -> impl Iterator<Item = ImageRef<'_>> {
        self.records
            .iter()
            .filter_map(|record| record.get("input").and_then(Value::as_object))
            .filter(|input| input.get("type").and_then(Value::as_str) == Some("image"))
            .map(ImageRef::new)
    }
}

impl From<Value> for ExampleGroup {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(records) => Self::new(records),
            record => Self::single(record),
        }
    }
}

impl From<Vec<Value>> for ExampleGroup {
    fn from(records: Vec<Value>) -> Self {
        Self::new(records)
    }
}

impl From<Map<String, Value>> for ExampleGroup {
    fn from(record: Map<String, Value>) -> Self {
        Self::single(Value::Object(record))
    }
}

/// 示例输入
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ExampleInput {
    /// 没有示例
    #[default]
    Absent,
    /// 一个示例组（单项调用时广播给唯一的消息组）
    Group(ExampleGroup),
    /// 与消息批次逐项对应的示例组，`None` 表示该项没有示例
    Batch(Vec<Option<ExampleGroup>>),
}

impl ExampleInput {
    /// 从 JSON 解析示例输入
    ///
    /// - `None`、`null` 以及空值（空数组、空对象、空字符串、`false`、`0`）视为没有示例
    /// - 第一个元素是数组或 `null` 的数组视为批量示例
    /// - 其他数组视为一个示例组，其他值视为单条示例
    pub fn from_json(value: Option<Value>) -> Self {
        let Some(value) = value.filter(|v| !is_empty_value(v)) else {
            return ExampleInput::Absent;
        };

        match value {
            Value::Array(items) if matches!(items.first(), Some(Value::Array(_) | Value::Null)) => {
                ExampleInput::Batch(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::Null => None,
                            other => Some(ExampleGroup::from(other)),
                        })
                        .collect(),
                )
            }
            other => ExampleInput::Group(ExampleGroup::from(other)),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ExampleInput::Absent)
    }
}

impl From<ExampleGroup> for ExampleInput {
    fn from(group: ExampleGroup) -> Self {
        ExampleInput::Group(group)
    }
}

impl From<Option<ExampleGroup>> for ExampleInput {
    fn from(group: Option<ExampleGroup>) -> Self {
        group.map_or(ExampleInput::Absent, ExampleInput::Group)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
