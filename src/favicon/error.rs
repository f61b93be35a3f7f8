//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载图标流水线中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! 任何错误对单次构建都是致命的：不重试、不降级、不返回部分产物。

/// 图标流水线统一错误类型。
///
/// 该类型会在应用层被上转为 `AppError`，由调用方翻译为传输层失败。
#[derive(Debug, thiserror::Error)]
pub enum FaviconError {
    #[error("缺少源图片：{0}")]
    NoSource(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("参数错误：{0}")]
    InvalidOptions(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("构建已取消：{0}")]
    Cancelled(String),

    #[error("文件错误：{0}")]
    FileSystem(String),

    #[error("归档错误：{0}")]
    Archive(String),

    #[error("任务错误：{0}")]
    Task(String),
}

impl FaviconError {
    /// 稳定错误码，供调用方映射到传输层状态。
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSource(_) => "NO_SOURCE",
            Self::Decode(_) => "DECODE_FAILED",
            Self::Encode(_) => "ENCODE_FAILED",
            Self::InvalidOptions(_) => "INVALID_OPTIONS",
            Self::ResourceLimit(_) => "RESOURCE_LIMIT",
            Self::Cancelled(_) => "CANCELLED",
            Self::FileSystem(_) => "FILE_SYSTEM",
            Self::Archive(_) => "ARCHIVE_FAILED",
            Self::Task(_) => "TASK_FAILED",
        }
    }

    /// 错误所属的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::FileSystem(_) => "loading",
            Self::NoSource(_) | Self::InvalidOptions(_) => "planning",
            Self::Decode(_) | Self::ResourceLimit(_) | Self::Task(_) => "resampling",
            Self::Encode(_) => "ico_encoding",
            Self::Archive(_) => "serializing",
            Self::Cancelled(_) => "cancelled",
        }
    }
}

impl From<FaviconError> for String {
    fn from(error: FaviconError) -> Self {
        error.to_string()
    }
}

impl From<zip::result::ZipError> for FaviconError {
    fn from(error: zip::result::ZipError) -> Self {
        Self::Archive(error.to_string())
    }
}
