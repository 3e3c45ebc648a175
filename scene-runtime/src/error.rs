//! # Error 模块
//!
//! 定义 scene-runtime 中使用的错误类型。

use thiserror::Error;

/// 资源记录解码错误
///
/// 槽位的值与 `_type` 标记必须成对读取，二者不一致时无法还原出可用的资源引用。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// 未知的类型标记
    #[error("未知的资源类型标记 '{tag}'")]
    UnknownTag { tag: String },

    /// 标记与值的形态不一致
    #[error("资源类型标记为 '{tag}'，但存储的值是{actual}")]
    TagMismatch { tag: String, actual: &'static str },
}

/// 名称解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// 无效的过渡阶段名
    #[error("无效的过渡阶段名 '{0}'")]
    InvalidPhase(String),

    /// 无效的页面名
    #[error("无效的页面名 '{0}'")]
    InvalidPage(String),

    /// 无效的槽位名
    #[error("无效的资源槽位名 '{0}'")]
    InvalidSlot(String),
}
