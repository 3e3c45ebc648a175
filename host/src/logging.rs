//! # Logging 模块
//!
//! 初始化 tracing 日志输出。

use tracing_subscriber::EnvFilter;

/// 安装全局 fmt subscriber
///
/// 优先使用 `RUST_LOG` 环境变量，未设置时使用 `level`。
/// 重复调用（例如测试中）不会报错。
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
