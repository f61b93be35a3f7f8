//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义应用级的 `AppError` 枚举，宿主（CLI、HTTP 适配层）统一返回 `Result<T, AppError>`。
//! 流水线内部错误仍是 `FaviconError`，只在应用边界上转。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `FaviconError` 与 `std::io::Error` 提供 `From` 转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，便于直接写进 JSON 响应。

use serde::Serialize;

use crate::favicon::FaviconError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图标流水线错误（加载 / 缩放 / 编码 / 打包）
    #[error("{0}")]
    Favicon(#[from] FaviconError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 配置文件不可用或格式错误
    #[error("配置错误: {0}")]
    Settings(String),
}

impl AppError {
    /// 稳定错误码，流水线错误沿用其自身的错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Favicon(err) => err.code(),
            Self::Io(_) => "IO_FAILED",
            Self::Settings(_) => "SETTINGS_INVALID",
        }
    }
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
