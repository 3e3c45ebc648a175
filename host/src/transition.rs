//! # Transition 模块
//!
//! 基于 tokio 计时器驱动新闻过渡的阶段序列。
//!
//! ## 设计要点
//!
//! - 创建即进入 `Idle`，之后的每一步都按**相对创建时刻的绝对偏移**触发
//!   （`sleep_until(start + offset)`），单步延迟不会累积
//! - 所有计时器由同一个任务串行等待，取消时整体中止
//! - 完成回调是 `FnOnce`，在任务中调用，不会在构造它的调用栈上执行
//! - 不支持重入：重新触发需要构造新实例

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use scene_runtime::{Point, TransitionPhase, TransitionStep, TransitionTimeline, TransitionVisual};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::debug;

/// 新闻过渡序列器
///
/// 必须在 tokio 运行时内创建。被丢弃时中止所有未触发的计时器。
pub struct TransitionSequencer {
    /// 起点（创建时捕获，不可变）
    origin: Point,
    /// 创建时刻
    started_at: Instant,
    /// 当前阶段
    phase_rx: watch::Receiver<TransitionPhase>,
    /// 完成回调是否已调用
    completed: Arc<AtomicBool>,
    /// 计时任务
    task: JoinHandle<()>,
}

impl TransitionSequencer {
    /// 开始过渡
    ///
    /// # 参数
    /// - `origin`: 起点屏幕坐标
    /// - `on_complete`: 完成回调，在 +3600ms 时调用且仅调用一次
    pub fn start<F>(origin: Point, on_complete: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let started_at = Instant::now();
        let (phase_tx, phase_rx) = watch::channel(TransitionPhase::Idle);
        let completed = Arc::new(AtomicBool::new(false));

        let completed_flag = completed.clone();
        let task = tokio::spawn(async move {
            let mut on_complete = Some(on_complete);

            for (offset, step) in TransitionTimeline::steps() {
                time::sleep_until(started_at + offset).await;

                match step {
                    TransitionStep::Enter(phase) => {
                        debug!(phase = %phase, "过渡阶段切换");
                        phase_tx.send_replace(phase);
                    }
                    TransitionStep::Complete => {
                        completed_flag.store(true, Ordering::SeqCst);
                        debug!("过渡完成");
                        if let Some(callback) = on_complete.take() {
                            callback();
                        }
                    }
                }
            }
        });

        debug!(x = origin.x, y = origin.y, "开始新闻过渡");

        Self {
            origin,
            started_at,
            phase_rx,
            completed,
            task,
        }
    }

    /// 当前阶段
    pub fn phase(&self) -> TransitionPhase {
        *self.phase_rx.borrow()
    }

    /// 订阅阶段变化
    pub fn subscribe(&self) -> watch::Receiver<TransitionPhase> {
        self.phase_rx.clone()
    }

    /// 起点
    pub fn origin(&self) -> Point {
        self.origin
    }

    /// 创建时刻
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// 当前阶段的视觉目标
    pub fn visual(&self) -> TransitionVisual {
        TransitionVisual::for_phase(self.phase(), self.origin)
    }

    /// 完成回调是否已调用
    pub fn is_finished(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// 取消过渡（等同于丢弃）
    pub fn cancel(self) {
        drop(self);
    }
}

/// 逐阶段回报过渡进度，直到完成通知到达
///
/// `done` 应由完成回调发送。返回是否收到了完成通知
/// （序列器在完成前被丢弃时返回 false）。
pub async fn follow<F>(
    sequencer: &TransitionSequencer,
    mut done: oneshot::Receiver<()>,
    mut on_phase: F,
) -> bool
where
    F: FnMut(TransitionPhase, TransitionVisual),
{
    let mut phases = sequencer.subscribe();
    phases.borrow_and_update();

    loop {
        // 计时任务在完成后退出并关闭阶段通道，完成分支须优先
        tokio::select! {
            biased;
            result = &mut done => return result.is_ok(),
            changed = phases.changed() => {
                if changed.is_err() {
                    return (&mut done).await.is_ok();
                }
                let phase = *phases.borrow_and_update();
                on_phase(phase, TransitionVisual::for_phase(phase, sequencer.origin()));
            }
        }
    }
}

impl Drop for TransitionSequencer {
    fn drop(&mut self) {
        if !self.is_finished() {
            debug!(phase = %self.phase(), "过渡被取消");
        }
        self.task.abort();
    }
}

impl std::fmt::Debug for TransitionSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionSequencer")
            .field("origin", &self.origin)
            .field("phase", &self.phase())
            .field("is_finished", &self.is_finished())
            .finish()
    }
}
