//! # Host 层
//!
//! 复古场景体验的宿主层实现，使用 SQLite 做本地持久化、tokio 做计时。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 资源配置的本地存档（[`AssetStore`] / [`SessionStore`]）
//! - 新闻过渡的计时驱动（[`TransitionSequencer`]）
//! - 应用状态的副作用调度（[`SceneApp`]）
//! - 配置加载与日志初始化
//!
//! Host 层不包含状态转换逻辑，状态转换由 `scene-runtime` 的 reducer 完成。

pub mod app;
pub mod config;
pub mod logging;
pub mod media;
pub mod store;
pub mod transition;

pub use app::SceneApp;
pub use config::{AppConfig, ConfigError, DefaultAssetsConfig, StorageConfig};
pub use store::{AssetStore, SessionStore, StoreError};
pub use transition::TransitionSequencer;
