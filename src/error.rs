use std::time::Duration;

use thiserror::Error;

/// 图片整理错误类型
#[derive(Debug, Error)]
pub enum VisionError {
    /// 示例批次长度与消息批次长度不一致
    #[error("示例批次长度 ({examples}) 与消息批次长度 ({messages}) 不一致")]
    BatchLengthMismatch { examples: usize, messages: usize },
    /// 边界输入形状无法识别
    #[error("输入格式错误: {0}")]
    InvalidInput(String),
    /// 图片获取失败
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// 视觉信息提取失败
    #[error("视觉信息提取失败: {source}")]
    Extract {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 图片获取错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 图片引用中没有 image / image_url 字段
    #[error("图片引用缺少 image 或 image_url 字段")]
    MissingSource,
    /// 无法识别的图片来源
    #[error("无法识别的图片来源: {0}")]
    UnsupportedSource(String),
    #[error("无效的图片 URL: {0}")]
    InvalidUrl(String),
    #[error("域名 '{0}' 不在允许列表中")]
    DisallowedDomain(String),
    #[error("不允许访问的本地路径: {0}")]
    DisallowedLocalPath(String),
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("读取本地图片失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("base64 解码失败: {0}")]
    Base64Decode(#[from] base64::DecodeError),
    #[error("data URL 解析失败: {0}")]
    DataUrl(String),
    #[error("图片获取超时 ({0:?})")]
    Timeout(Duration),
}

// ========== 便捷构造函数 ==========

impl VisionError {
    /// 创建批次长度不一致错误
    pub fn batch_length_mismatch(examples: usize, messages: usize) -> Self {
        VisionError::BatchLengthMismatch { examples, messages }
    }

    /// 创建输入格式错误
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        VisionError::InvalidInput(msg.into())
    }

    /// 包装自定义提取器的错误
    pub fn extract_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        VisionError::Extract {
            source: Box::new(source),
        }
    }
}

/// 结果类型别名
pub type VisionResult<T> = Result<T, VisionError>;
