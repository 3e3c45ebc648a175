//! # App 模块
//!
//! 宿主层的应用控制器：持有 [`AppState`]，把用户操作交给 reducer，
//! 并负责由状态变化引出的副作用：
//!
//! - 新闻过渡开始 / 结束时创建或丢弃 [`TransitionSequencer`]
//! - 读档 / 存档并更新状态栏消息
//! - 成功消息显示一段时间后自动清除
//!
//! 异步产生的操作（过渡完成、清除状态）通过内部通道回流，
//! 由 [`SceneApp::next_action`] 取出并应用。回流事件带有产生它的过渡 / 计时器代号，
//! 代号已过期的事件（过渡被打断后重新开始、状态消息已被替换）直接丢弃。
//! 展示层通过 [`SceneApp::subscribe`] 订阅状态，而不直接修改任何字段。

use std::time::Duration;

use scene_runtime::{Action, AppState, SessionAssets, StatusMessage, reduce};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::store::{AssetStore, SessionStore, StoreError};
use crate::transition::TransitionSequencer;

/// 计时器回流的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    /// 第 `run` 次新闻过渡完成
    TransitionCompleted { run: u64 },
    /// 清除第 `seq` 条状态消息
    ClearStatus { seq: u64 },
}

/// 应用控制器
pub struct SceneApp {
    state_tx: watch::Sender<AppState>,
    sessions: SessionStore,
    /// 成功消息显示时长
    status_display: Duration,
    deferred_tx: mpsc::UnboundedSender<Deferred>,
    deferred_rx: mpsc::UnboundedReceiver<Deferred>,
    /// 正在进行的新闻过渡
    transition: Option<TransitionSequencer>,
    /// 最近一次开始的过渡代号
    transition_run: u64,
    /// 状态消息自动清除计时
    status_timer: Option<JoinHandle<()>>,
    /// 最近一次状态变更的序号
    status_seq: u64,
}

impl SceneApp {
    /// 按配置创建
    pub fn new(config: &AppConfig) -> Self {
        let store = AssetStore::from_config(&config.storage);
        Self::with_sessions(
            SessionStore::new(store),
            config.defaults.to_session_assets(),
            config.status_display(),
        )
    }

    pub fn with_sessions(
        sessions: SessionStore,
        assets: SessionAssets,
        status_display: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(AppState::new(assets));
        let (deferred_tx, deferred_rx) = mpsc::unbounded_channel();

        Self {
            state_tx,
            sessions,
            status_display,
            deferred_tx,
            deferred_rx,
            transition: None,
            transition_run: 0,
            status_timer: None,
            status_seq: 0,
        }
    }

    /// 当前状态快照
    pub fn state(&self) -> AppState {
        self.state_tx.borrow().clone()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state_tx.subscribe()
    }

    /// 正在进行的新闻过渡
    pub fn transition(&self) -> Option<&TransitionSequencer> {
        self.transition.as_ref()
    }

    /// 应用一个操作
    pub fn dispatch(&mut self, action: Action) {
        let prev = self.state();
        let next = reduce(&prev, action.clone());

        match (prev.news_transition, next.news_transition) {
            (None, Some(origin)) => {
                self.transition_run += 1;
                let run = self.transition_run;
                let deferred = self.deferred_tx.clone();
                self.transition = Some(TransitionSequencer::start(origin, move || {
                    let _ = deferred.send(Deferred::TransitionCompleted { run });
                }));
            }
            // 完成或被导航打断：丢弃序列器（未完成时中止计时器）
            (Some(_), None) => self.transition = None,
            _ => {}
        }

        if matches!(action, Action::SetStatus(_) | Action::ClearStatus) {
            self.status_seq += 1;
            if let Some(timer) = self.status_timer.take() {
                timer.abort();
            }
            if let Action::SetStatus(status) = action
                && status.auto_clears()
            {
                self.status_timer = Some(self.schedule_clear(self.status_seq));
            }
        }

        self.state_tx.send_replace(next);
    }

    /// 等待并应用下一个异步产生的操作
    ///
    /// 过期的事件被跳过，不会返回。
    pub async fn next_action(&mut self) -> Option<Action> {
        loop {
            let deferred = self.deferred_rx.recv().await?;
            if let Some(action) = self.accept(deferred) {
                self.dispatch(action.clone());
                return Some(action);
            }
        }
    }

    /// 回流事件仍然有效时转为操作
    fn accept(&self, deferred: Deferred) -> Option<Action> {
        match deferred {
            Deferred::TransitionCompleted { run }
                if self.transition.is_some() && run == self.transition_run =>
            {
                Some(Action::TransitionCompleted)
            }
            Deferred::ClearStatus { seq } if seq == self.status_seq => Some(Action::ClearStatus),
            stale => {
                debug!(event = ?stale, "丢弃过期的回流事件");
                None
            }
        }
    }

    /// 保存当前资源配置
    ///
    /// 失败时只更新状态栏，资源状态保持不变。
    pub async fn save_configuration(&mut self) -> Result<(), StoreError> {
        self.dispatch(Action::SetStatus(StatusMessage::Saving));
        let assets = self.state_tx.borrow().assets.clone();

        match self.sessions.save_session(&assets).await {
            Ok(()) => {
                self.dispatch(Action::SetStatus(StatusMessage::Saved));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "保存资源配置失败");
                self.dispatch(Action::SetStatus(StatusMessage::SaveFailed));
                Err(e)
            }
        }
    }

    /// 读取上次保存的资源配置
    ///
    /// 只覆盖存档中存在的槽位；失败时资源状态保持不变。
    pub async fn load_configuration(&mut self) -> Result<(), StoreError> {
        self.dispatch(Action::SetStatus(StatusMessage::Loading));

        match self.sessions.load_session().await {
            Ok(assets) => {
                info!(slots = assets.entries().count(), "资源配置已恢复");
                self.dispatch(Action::AssetsLoaded(assets));
                self.dispatch(Action::SetStatus(StatusMessage::Loaded));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "读取资源配置失败");
                self.dispatch(Action::SetStatus(StatusMessage::LoadFailed));
                Err(e)
            }
        }
    }

    /// 是否存在可读取的上次会话
    pub async fn has_saved_session(&self) -> bool {
        self.sessions.has_saved_session().await
    }

    fn schedule_clear(&self, seq: u64) -> JoinHandle<()> {
        let deferred = self.deferred_tx.clone();
        let delay = self.status_display;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = deferred.send(Deferred::ClearStatus { seq });
        })
    }
}

impl Drop for SceneApp {
    fn drop(&mut self) {
        if let Some(timer) = self.status_timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_runtime::state::NEWS_HUNTER_ID;
    use scene_runtime::{AssetSource, Page, Point, TransitionPhase};

    fn app_with(store: AssetStore) -> SceneApp {
        SceneApp::with_sessions(
            SessionStore::new(store),
            SessionAssets::with_defaults(),
            Duration::from_millis(2000),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_news_transition_flow() {
        let mut app = app_with(AssetStore::unsupported());
        let origin = Point::new(300.0, 150.0);

        app.dispatch(Action::BannerClicked {
            hunter_id: NEWS_HUNTER_ID,
            origin,
        });
        assert!(app.state().is_transitioning());
        assert_eq!(app.transition().map(|t| t.origin()), Some(origin));

        let action = app.next_action().await;
        assert_eq!(action, Some(Action::TransitionCompleted));

        let state = app.state();
        assert_eq!(state.page, Page::News);
        assert!(state.nav_visible());
        assert!(app.transition().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_tears_down_transition() {
        let mut app = app_with(AssetStore::unsupported());
        app.dispatch(Action::BannerClicked {
            hunter_id: NEWS_HUNTER_ID,
            origin: Point::default(),
        });

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(
            app.transition().map(|t| t.phase()),
            Some(TransitionPhase::Condensing)
        );

        app.dispatch(Action::Navigate(Page::Contact));
        assert!(app.transition().is_none());

        let waited = tokio::time::timeout(Duration::from_secs(10), app.next_action()).await;
        assert!(waited.is_err(), "取消后不应再收到完成通知");
        assert_eq!(app.state().page, Page::Contact);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_run_does_not_complete_next_run() {
        let mut app = app_with(AssetStore::unsupported());
        let banner = Action::BannerClicked {
            hunter_id: NEWS_HUNTER_ID,
            origin: Point::new(40.0, 40.0),
        };

        // 第一次过渡完成，但完成事件还留在队列中
        app.dispatch(banner.clone());
        tokio::time::sleep(Duration::from_millis(3700)).await;
        app.dispatch(Action::Navigate(Page::Scene));

        app.dispatch(banner);
        let restarted = tokio::time::Instant::now();
        assert_eq!(
            app.transition().map(|t| t.phase()),
            Some(TransitionPhase::Idle)
        );

        let action = app.next_action().await;
        assert_eq!(action, Some(Action::TransitionCompleted));
        assert!(restarted.elapsed() >= Duration::from_millis(3600));
        assert_eq!(app.state().page, Page::News);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_clear_does_not_hide_newer_error() {
        let mut app = app_with(AssetStore::unsupported());
        app.dispatch(Action::SetStatus(StatusMessage::Saved));

        // 清除事件已发出但尚未应用
        tokio::time::sleep(Duration::from_millis(2100)).await;
        app.dispatch(Action::SetStatus(StatusMessage::SaveFailed));

        let waited = tokio::time::timeout(Duration::from_secs(5), app.next_action()).await;
        assert!(waited.is_err());
        assert_eq!(app.state().status, Some(StatusMessage::SaveFailed));
    }

    #[tokio::test]
    async fn test_save_failure_keeps_state() {
        let mut app = app_with(AssetStore::unsupported());
        let before = app.state().assets;

        let result = app.save_configuration().await;
        assert!(matches!(result, Err(StoreError::UnsupportedEnvironment)));

        let state = app.state();
        assert_eq!(state.status, Some(StatusMessage::SaveFailed));
        assert_eq!(state.assets, before);
        assert!(!app.has_saved_session().await);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path().join("app.db"));

        let mut app = app_with(store.clone());
        let custom = AssetSource::Content(vec![0xFF, 0xD8, 0xFF]);
        let mut assets = app.state().assets;
        assets.set(scene_runtime::AssetSlot::Image, custom.clone());
        app.dispatch(Action::SetupCompleted(assets));

        app.save_configuration().await.unwrap();
        assert_eq!(app.state().status, Some(StatusMessage::Saved));
        assert!(app.has_saved_session().await);

        let mut fresh = app_with(store);
        fresh.load_configuration().await.unwrap();
        let state = fresh.state();
        assert_eq!(state.assets.image, Some(custom));
        assert_eq!(state.status, Some(StatusMessage::Loaded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_status_auto_clears() {
        let mut app = app_with(AssetStore::unsupported());
        app.dispatch(Action::SetStatus(StatusMessage::Loaded));

        let action = app.next_action().await;
        assert_eq!(action, Some(Action::ClearStatus));
        assert_eq!(app.state().status, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_status_replaces_timer() {
        let mut app = app_with(AssetStore::unsupported());
        app.dispatch(Action::SetStatus(StatusMessage::Saved));
        app.dispatch(Action::SetStatus(StatusMessage::SaveFailed));

        let waited = tokio::time::timeout(Duration::from_secs(5), app.next_action()).await;
        assert!(waited.is_err());
        assert_eq!(app.state().status, Some(StatusMessage::SaveFailed));
    }
}
