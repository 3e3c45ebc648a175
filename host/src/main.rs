//! # Scene Host (headless)
//!
//! 不启动界面，直接操作资源存档或运行一次新闻过渡。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p scene-host -- check
//! cargo run -p scene-host -- save --image @photos/scene.jpg --video https://example.com/clip.mp4
//! cargo run -p scene-host -- load
//! cargo run -p scene-host -- clear
//! cargo run -p scene-host -- transition --x 640 --y 360
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use scene_host::{AppConfig, AssetStore, SessionStore, TransitionSequencer, logging, media, transition};
use scene_runtime::{AssetSlot, AssetSource, Point, SessionAssets};
use tokio::sync::oneshot;
use tracing::{error, info};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser)]
#[command(name = "scene-host")]
#[command(about = "复古场景宿主 - 资源存档与过渡调试工具")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件路径（默认：config.json）
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// 日志级别（覆盖配置文件）
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 检查是否存在上次保存的会话
    Check,

    /// 保存资源配置
    ///
    /// 以 `@` 开头的参数作为本地文件读入并保存原始内容，其余作为引用保存。
    /// 未指定的槽位使用配置中的默认资源。
    Save {
        /// 场景主图
        #[arg(long)]
        image: Option<String>,

        /// 过场视频
        #[arg(long)]
        video: Option<String>,

        /// 终幕媒体
        #[arg(long)]
        landing: Option<String>,
    },

    /// 读取并列出已保存的资源配置
    Load,

    /// 删除已保存的资源配置
    Clear,

    /// 运行一次新闻过渡并输出各阶段
    Transition {
        /// 起点 X（像素）
        #[arg(long, default_value = "0")]
        x: f32,

        /// 起点 Y（像素）
        #[arg(long, default_value = "0")]
        y: f32,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 日志级别可能来自配置文件：先静默读取，初始化日志后再记录结果
    let loaded = AppConfig::try_load(&cli.config);
    let level = match (&cli.log_level, &loaded) {
        (Some(level), _) => level.as_str(),
        (None, Ok(config)) => config.log_level.as_str(),
        (None, Err(_)) => DEFAULT_LOG_LEVEL,
    };
    logging::init(level);
    let config = AppConfig::resolve(&cli.config, loaded);

    if let Err(e) = config.validate() {
        error!(error = %e, "配置无效");
        eprintln!("❌ {}", e);
        return ExitCode::from(1);
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "命令执行失败");
            eprintln!("❌ {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(command: Commands, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = SessionStore::new(AssetStore::from_config(&config.storage));

    match command {
        Commands::Check => {
            if sessions.has_saved_session().await {
                let saved_at = sessions.last_saved_at().await?.unwrap_or_default();
                println!("💾 存在已保存的会话 {}", saved_at);
            } else {
                println!("💾 没有已保存的会话");
            }
        }
        Commands::Save {
            image,
            video,
            landing,
        } => {
            let mut assets = config.defaults.to_session_assets();
            for (slot, arg) in [
                (AssetSlot::Image, image),
                (AssetSlot::Video, video),
                (AssetSlot::Landing, landing),
            ] {
                if let Some(arg) = arg {
                    assets.set(slot, parse_source(&arg)?);
                }
            }
            sessions.save_session(&assets).await?;
            print_assets(&assets);
            println!("💾 会话已保存");
        }
        Commands::Load => {
            let assets = sessions.load_session().await?;
            if assets.is_empty() {
                println!("💾 没有已保存的会话");
            } else {
                print_assets(&assets);
            }
        }
        Commands::Clear => {
            sessions.clear_session().await?;
            println!("💾 会话已删除");
        }
        Commands::Transition { x, y } => {
            let (done_tx, done_rx) = oneshot::channel();
            let sequencer = TransitionSequencer::start(Point::new(x, y), move || {
                let _ = done_tx.send(());
            });

            println!("🎬 {}", sequencer.phase());

            let completed = transition::follow(&sequencer, done_rx, |phase, visual| {
                println!(
                    "🎬 {} (anchor = {:.0},{:.0}, scale = {:.1})",
                    phase, visual.anchor.x, visual.anchor.y, visual.scale
                );
            })
            .await;

            if completed {
                info!("过渡完成");
                println!("🎬 完成");
            }
        }
    }

    Ok(())
}

/// 解析资源参数：`@path` 读取文件内容，其余视为引用
fn parse_source(arg: &str) -> std::io::Result<AssetSource> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(AssetSource::Content(std::fs::read(path)?)),
        None => Ok(AssetSource::reference(arg)),
    }
}

fn print_assets(assets: &SessionAssets) {
    for (slot, source) in assets.entries() {
        let kind = media::detect(source);
        match source {
            AssetSource::Reference(reference) => {
                println!("  {:<8} {:?} 引用 {}", slot.key(), kind, reference)
            }
            AssetSource::Content(bytes) => {
                println!("  {:<8} {:?} 内容 {} 字节", slot.key(), kind, bytes.len())
            }
        }
    }
}
