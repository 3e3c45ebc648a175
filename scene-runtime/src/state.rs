//! # State 模块
//!
//! 应用状态与纯函数式的状态更新（reducer）。
//!
//! ## 设计原则
//!
//! - 所有界面状态都**显式建模**在 [`AppState`] 中
//! - 状态只能通过 [`reduce`] 更新，展示层订阅结果而不持有可变字段
//! - 不允许隐式全局状态

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::asset::SessionAssets;
use crate::error::ParseError;
use crate::transition::Point;

/// 点击后进入过场视频的猎人
pub const RESEARCH_HUNTER_ID: u32 = 1;
/// 点击后播放新闻过渡的猎人
pub const NEWS_HUNTER_ID: u32 = 3;

/// 页面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Page {
    /// 资源配置
    Setup,
    /// 猎人场景（入口）
    #[default]
    Scene,
    /// 过场视频
    Video,
    /// 终幕马赛克
    Landing,
    /// 新闻页
    News,
    About,
    Contact,
}

impl Page {
    /// 导航菜单中的页面（按显示顺序）
    pub const MENU: [Page; 5] = [Page::Scene, Page::Landing, Page::News, Page::About, Page::Contact];

    pub fn name(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Scene => "scene",
            Self::Video => "video",
            Self::Landing => "landing",
            Self::News => "news",
            Self::About => "about",
            Self::Contact => "contact",
        }
    }

    /// 导航菜单标签
    pub fn label(self) -> &'static str {
        match self {
            Self::Setup => "Setup",
            Self::Scene => "Hunter Scene",
            Self::Video => "Video",
            Self::Landing => "Finale Art",
            Self::News => "News",
            Self::About => "About",
            Self::Contact => "Contact",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Page {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "setup" => Ok(Self::Setup),
            "scene" => Ok(Self::Scene),
            "video" => Ok(Self::Video),
            "landing" => Ok(Self::Landing),
            "news" => Ok(Self::News),
            "about" => Ok(Self::About),
            "contact" => Ok(Self::Contact),
            _ => Err(ParseError::InvalidPage(s.to_string())),
        }
    }
}

/// 状态栏消息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusMessage {
    Saving,
    Saved,
    SaveFailed,
    Loading,
    Loaded,
    LoadFailed,
}

impl StatusMessage {
    pub fn text(self) -> &'static str {
        match self {
            Self::Saving => "Saving...",
            Self::Saved => "Saved!",
            Self::SaveFailed => "Error saving",
            Self::Loading => "Loading...",
            Self::Loaded => "Loaded!",
            Self::LoadFailed => "Error loading",
        }
    }

    /// 成功消息在显示一段时间后自动清除，错误消息保留
    pub fn auto_clears(self) -> bool {
        matches!(self, Self::Saved | Self::Loaded)
    }
}

/// 用户操作 / 异步结果
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// 点击猎人热区（再次点击解锁）
    ToggleHunterLock(u32),
    /// 点击已展开的横幅，`origin` 为横幅几何中心
    BannerClicked { hunter_id: u32, origin: Point },
    /// 新闻过渡完成
    TransitionCompleted,
    /// 过场视频播放结束（或被点击跳过）
    VideoFinished,
    /// 导航菜单跳转
    Navigate(Page),
    /// 配置页确认
    SetupCompleted(SessionAssets),
    /// 读档结果（只覆盖存在的槽位）
    AssetsLoaded(SessionAssets),
    ToggleDebug,
    SelectFish(Option<String>),
    SetStatus(StatusMessage),
    ClearStatus,
}

/// 应用状态
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub page: Page,
    pub assets: SessionAssets,
    /// 当前展开横幅的猎人
    pub locked_hunter: Option<u32>,
    pub show_debug: bool,
    /// 正在进行的新闻过渡起点
    pub news_transition: Option<Point>,
    /// 终幕中选中的鱼
    pub selected_fish: Option<String>,
    pub status: Option<StatusMessage>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(SessionAssets::with_defaults())
    }
}

impl AppState {
    pub fn new(assets: SessionAssets) -> Self {
        Self {
            page: Page::default(),
            assets,
            locked_hunter: None,
            show_debug: false,
            news_transition: None,
            selected_fish: None,
            status: None,
        }
    }

    /// 是否正在进行新闻过渡
    pub fn is_transitioning(&self) -> bool {
        self.news_transition.is_some()
    }

    /// 导航菜单是否可见（配置页和过渡期间隐藏）
    pub fn nav_visible(&self) -> bool {
        self.page != Page::Setup && !self.is_transitioning()
    }
}

/// 计算下一个状态
pub fn reduce(state: &AppState, action: Action) -> AppState {
    let mut next = state.clone();

    match action {
        Action::ToggleHunterLock(id) => {
            next.locked_hunter = if state.locked_hunter == Some(id) {
                None
            } else {
                Some(id)
            };
        }
        Action::BannerClicked { hunter_id, origin } => match hunter_id {
            RESEARCH_HUNTER_ID => next.page = Page::Video,
            // 过渡进行中不可重入
            NEWS_HUNTER_ID if !state.is_transitioning() => next.news_transition = Some(origin),
            _ => {}
        },
        Action::TransitionCompleted => {
            // 过渡被手动导航打断后，迟到的完成通知不再切页
            if state.is_transitioning() {
                next.news_transition = None;
                next.page = Page::News;
            }
        }
        Action::VideoFinished => {
            if state.page == Page::Video {
                next.page = Page::Landing;
            }
        }
        Action::Navigate(page) => {
            next.page = page;
            next.news_transition = None;
        }
        Action::SetupCompleted(assets) => {
            next.assets = assets;
            next.page = Page::Scene;
        }
        Action::AssetsLoaded(assets) => next.assets.merge(assets),
        Action::ToggleDebug => next.show_debug = !state.show_debug,
        Action::SelectFish(id) => next.selected_fish = id,
        Action::SetStatus(status) => next.status = Some(status),
        Action::ClearStatus => next.status = None,
    }

    next
}
