//! # NuExtract Vision
//!
//! 为视觉语言模型推理整理图片输入：把上下文示例和消息中的图片
//! 按"示例在前、消息在后、逐项拼接"的顺序展开成一个列表。
//!
//! ## 架构设计
//!
//! ### ① 数据模型（Models）
//! - `models/input` - 消息与示例的输入形状（单项 / 批量），在边界上一次性解析
//! - `models/image` - 图片引用、已获取的图片、视觉信息提取结果
//!
//! ### ② 业务能力层（Services）
//! - `ImageFetcher` / `VisionInfoExtractor` - 两个协作者接口
//! - `MediaFetcher` - 从 URL、data URL、本地文件获取图片字节
//! - `ContentPartExtractor` - 扫描消息内容块提取图片
//!
//! ### ③ 流程层（Workflow）
//! - `ImageOrderer` - 确定示例配对方式，逐项整理图片
//!
//! ## 使用示例
//!
//! ```no_run
//! use nuextract_vision::utils::logging;
//! use nuextract_vision::{Config, DefaultImageOrderer};
//! use serde_json::json;
//!
//! # fn main() -> nuextract_vision::VisionResult<()> {
//! let config = Config::from_env();
//! logging::init(config.verbose_logging).ok();
//!
//! let orderer = DefaultImageOrderer::from_config(&config)?;
//! let messages = json!([{"role": "user", "content": [
//!     {"type": "image", "image": "https://example.com/invoice.png"},
//!     {"type": "text", "text": "提取发票信息"}
//! ]}]);
//! let images = orderer.order_json(messages, None)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{FetchError, VisionError, VisionResult};
pub use models::{
    Batched, ExampleGroup, ExampleInput, FetchedImage, ImageRef, ImageSource, MessageGroup,
    MessageInput, VisionInfo,
};
pub use services::{ContentPartExtractor, ImageFetcher, MediaFetcher, MediaSource, VisionInfoExtractor};
pub use workflow::{DefaultImageOrderer, ExamplePairing, ImageOrderer};
