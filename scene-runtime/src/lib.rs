//! # Scene Runtime
//!
//! 复古场景体验的核心逻辑库。
//!
//! ## 架构概述
//!
//! `scene-runtime` 是纯逻辑核心，不依赖任何 IO、数据库或计时器。
//! 宿主层（host）负责持久化与时间驱动，并通过本库的类型交换数据：
//!
//! ```text
//! Presentation                 Runtime                      Host
//!   │── Action ──────────────►│ reduce()                    │
//!   │◄── AppState ────────────│                             │
//!   │                         │ SessionAssets ◄────────────►│ SessionStore (SQLite)
//!   │◄── TransitionPhase ─────│ TransitionTimeline ────────►│ TransitionSequencer (tokio)
//! ```
//!
//! ## 模块结构
//!
//! - [`asset`]：资源槽位、资源来源与存储值
//! - [`transition`]：新闻过渡的阶段、时间轴与视觉目标
//! - [`state`]：应用状态与 reducer
//! - [`error`]：错误类型定义

pub mod asset;
pub mod error;
pub mod state;
pub mod transition;

// 重导出核心类型
pub use asset::{AssetSlot, AssetSource, MediaKind, SessionAssets, StoredValue};
pub use error::{AssetError, ParseError};
pub use state::{Action, AppState, Page, StatusMessage, reduce};
pub use transition::{
    Point, TransitionClock, TransitionEvent, TransitionPhase, TransitionStep, TransitionTimeline,
    TransitionVisual,
};
