//! # Store Error 模块
//!
//! 定义资源持久化相关的错误类型。
//!
//! 所有错误都可恢复：调用方显示一条短暂的状态消息，保持当前内存状态不变。

use scene_runtime::AssetError;
use thiserror::Error;

/// 资源存储错误
#[derive(Error, Debug)]
pub enum StoreError {
    /// 当前环境没有本地数据库能力（持久化被禁用或未配置位置）
    #[error("当前环境不支持本地资源存储")]
    UnsupportedEnvironment,

    /// 打开数据库失败
    #[error("打开资源数据库失败: {path} - {message}")]
    OpenError {
        /// 数据库路径
        path: String,
        /// 错误消息
        message: String,
    },

    /// 写事务失败（事务已回滚）
    #[error("写入资源失败: {key} - {message}")]
    WriteError {
        /// 涉及的键（多键写入时以逗号分隔）
        key: String,
        /// 错误消息
        message: String,
    },

    /// 读事务失败
    #[error("读取资源失败: {key} - {message}")]
    ReadError {
        /// 涉及的键
        key: String,
        /// 错误消息
        message: String,
    },

    /// 槽位的值与类型标记不一致
    #[error("资源记录无效: {key} - {source}")]
    InvalidRecord {
        /// 槽位键
        key: String,
        #[source]
        source: AssetError,
    },
}
