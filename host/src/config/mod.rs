//! # Config 模块
//!
//! 运行时配置管理，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scene_runtime::asset::{DEFAULT_LANDING_SRC, DEFAULT_VIDEO_SRC, INITIAL_IMAGE_SRC};
use scene_runtime::{AssetSource, SessionAssets};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 本地存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 默认资源
    #[serde(default)]
    pub defaults: DefaultAssetsConfig,

    /// 成功状态消息的显示时长（毫秒）
    #[serde(default = "default_status_display_ms")]
    pub status_display_ms: u64,

    /// 日志级别（可被 RUST_LOG 覆盖）
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// 本地存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 是否启用本地存储
    ///
    /// 关闭后所有存储操作返回 `UnsupportedEnvironment`，存档检查返回 false。
    #[serde(default = "default_storage_enabled")]
    pub enabled: bool,

    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

/// 默认资源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultAssetsConfig {
    /// 场景主图
    #[serde(default = "default_image")]
    pub image: String,

    /// 过场视频
    #[serde(default = "default_video")]
    pub video: String,

    /// 终幕媒体
    #[serde(default = "default_landing")]
    pub landing: String,
}

impl DefaultAssetsConfig {
    /// 转为三个槽位都是引用的会话资源
    pub fn to_session_assets(&self) -> SessionAssets {
        SessionAssets {
            image: Some(AssetSource::reference(&self.image)),
            video: Some(AssetSource::reference(&self.video)),
            landing: Some(AssetSource::reference(&self.landing)),
        }
    }
}

// 默认值函数
fn default_storage_enabled() -> bool {
    true
}

fn default_db_path() -> PathBuf {
    PathBuf::from("saves").join("scene_assets.db")
}

fn default_image() -> String {
    INITIAL_IMAGE_SRC.to_string()
}

fn default_video() -> String {
    DEFAULT_VIDEO_SRC.to_string()
}

fn default_landing() -> String {
    DEFAULT_LANDING_SRC.to_string()
}

fn default_status_display_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            defaults: DefaultAssetsConfig::default(),
            status_display_ms: default_status_display_ms(),
            log_level: default_log_level(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_storage_enabled(),
            db_path: default_db_path(),
        }
    }
}

impl Default for DefaultAssetsConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            video: default_video(),
            landing: default_landing(),
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并打印警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::resolve(path, Self::try_load(path))
    }

    /// 读取并解析配置文件，不输出日志
    ///
    /// 供日志系统尚未初始化时使用（日志级别本身来自配置）。
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// 记录 [`try_load`](Self::try_load) 的结果，失败时退回默认配置
    pub fn resolve(path: &Path, loaded: Result<Self, ConfigError>) -> Self {
        match loaded {
            Ok(config) => {
                info!(path = ?path, "配置文件加载成功");
                config
            }
            Err(ConfigError::NotFound(_)) => {
                warn!(path = ?path, "配置文件不存在，使用默认配置");
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "配置文件无效，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 成功状态消息的显示时长
    pub fn status_display(&self) -> Duration {
        Duration::from_millis(self.status_display_ms)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.enabled && self.storage.db_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "启用本地存储时必须配置 db_path".to_string(),
            ));
        }

        for (name, value) in [
            ("image", &self.defaults.image),
            ("video", &self.defaults.video),
            ("landing", &self.defaults.landing),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "默认资源 {} 不能为空",
                    name
                )));
            }
        }

        if self.status_display_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "status_display_ms 必须大于 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// 配置文件不存在
    #[error("配置文件不存在: {0}")]
    NotFound(PathBuf),
    /// 解析失败
    #[error("配置解析失败: {0}")]
    ParseFailed(String),
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}
