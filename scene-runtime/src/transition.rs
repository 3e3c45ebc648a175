//! # Transition 模块
//!
//! 新闻页过渡的阶段状态机（纯逻辑，不持有计时器）。
//!
//! ## 时间轴
//!
//! 所有偏移都从实例创建时刻起算：
//!
//! ```text
//! +0ms     Idle        锁定点击位置，标题文字可见
//! +100ms   Fading      背景淡入黑色
//! +1100ms  Condensing  文字收缩为圆球
//! +2100ms  Moving      圆球飞向页眉位置
//! +3600ms  完成        通知调用方（仅一次）
//! ```
//!
//! 阶段转换完全由时间驱动（开环），假设展示层的动画时长与上述延迟一致。
//! 异步计时器驱动见 host 层的 `TransitionSequencer`；渲染循环驱动可直接使用
//! [`TransitionClock`]。

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// 进入 Fading 的偏移（毫秒）
pub const FADE_AT_MS: u64 = 100;
/// 进入 Condensing 的偏移（毫秒）
pub const CONDENSE_AT_MS: u64 = 1100;
/// 进入 Moving 的偏移（毫秒）
pub const MOVE_AT_MS: u64 = 2100;
/// 完成通知的偏移（毫秒）
pub const COMPLETE_AT_MS: u64 = 3600;

/// 圆球的终点（页眉左上角，left 20px / top 4rem）
pub const DESTINATION: Point = Point { x: 20.0, y: 64.0 };

/// 收缩后的圆球缩放
const CONDENSED_SCALE: f32 = 0.2;

/// 屏幕坐标（像素）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 过渡阶段
///
/// 严格有序、单调推进、不会回退。完成是隐式终态，不单独建模为阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPhase {
    /// 初始：锁定起点
    Idle,
    /// 背景淡入
    Fading,
    /// 收缩为圆球
    Condensing,
    /// 移动到终点
    Moving,
}

impl TransitionPhase {
    /// 按顺序排列的全部阶段
    pub const ORDER: [TransitionPhase; 4] = [
        TransitionPhase::Idle,
        TransitionPhase::Fading,
        TransitionPhase::Condensing,
        TransitionPhase::Moving,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fading => "fading",
            Self::Condensing => "condensing",
            Self::Moving => "moving",
        }
    }

    /// 展示层样式使用的短名（lock / fade / ball / move）
    pub fn legacy_name(self) -> &'static str {
        match self {
            Self::Idle => "lock",
            Self::Fading => "fade",
            Self::Condensing => "ball",
            Self::Moving => "move",
        }
    }

    /// 下一阶段（Moving 之后返回 None）
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::Fading),
            Self::Fading => Some(Self::Condensing),
            Self::Condensing => Some(Self::Moving),
            Self::Moving => None,
        }
    }
}

impl fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransitionPhase {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" | "lock" => Ok(Self::Idle),
            "fading" | "fade" => Ok(Self::Fading),
            "condensing" | "ball" => Ok(Self::Condensing),
            "moving" | "move" => Ok(Self::Moving),
            other => Err(ParseError::InvalidPhase(other.to_string())),
        }
    }
}

/// 时间轴上的一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStep {
    /// 进入某个阶段
    Enter(TransitionPhase),
    /// 过渡完成
    Complete,
}

/// 状态机对外发出的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEvent {
    PhaseChanged(TransitionPhase),
    Completed,
}

impl From<TransitionStep> for TransitionEvent {
    fn from(step: TransitionStep) -> Self {
        match step {
            TransitionStep::Enter(phase) => Self::PhaseChanged(phase),
            TransitionStep::Complete => Self::Completed,
        }
    }
}

/// 固定时间轴
pub struct TransitionTimeline;

impl TransitionTimeline {
    /// 有序的（偏移，步骤）列表
    pub const fn steps() -> [(Duration, TransitionStep); 4] {
        [
            (
                Duration::from_millis(FADE_AT_MS),
                TransitionStep::Enter(TransitionPhase::Fading),
            ),
            (
                Duration::from_millis(CONDENSE_AT_MS),
                TransitionStep::Enter(TransitionPhase::Condensing),
            ),
            (
                Duration::from_millis(MOVE_AT_MS),
                TransitionStep::Enter(TransitionPhase::Moving),
            ),
            (
                Duration::from_millis(COMPLETE_AT_MS),
                TransitionStep::Complete,
            ),
        ]
    }

    /// 总时长
    pub const fn total() -> Duration {
        Duration::from_millis(COMPLETE_AT_MS)
    }

    /// 给定已过时长对应的阶段
    ///
    /// 区间左闭右开：`[100, 1100)` 为 Fading，依此类推。完成后仍停留在 Moving。
    pub fn phase_at(elapsed: Duration) -> TransitionPhase {
        let ms = elapsed.as_millis();
        if ms < FADE_AT_MS as u128 {
            TransitionPhase::Idle
        } else if ms < CONDENSE_AT_MS as u128 {
            TransitionPhase::Fading
        } else if ms < MOVE_AT_MS as u128 {
            TransitionPhase::Condensing
        } else {
            TransitionPhase::Moving
        }
    }

    pub fn is_complete_at(elapsed: Duration) -> bool {
        elapsed >= Self::total()
    }
}

/// 帧驱动的过渡时钟
///
/// 适用于有渲染循环的宿主：每帧调用 `update(dt)`，返回本帧跨过的事件。
/// 单帧 `dt` 很大时（窗口被挂起后恢复）会一次性按顺序补发所有跨过的事件，
/// 既不跳过也不重排。
#[derive(Debug, Clone)]
pub struct TransitionClock {
    origin: Point,
    elapsed: Duration,
    /// 下一个待触发步骤的下标
    cursor: usize,
    phase: TransitionPhase,
}

impl TransitionClock {
    pub fn new(origin: Point) -> Self {
        Self {
            origin,
            elapsed: Duration::ZERO,
            cursor: 0,
            phase: TransitionPhase::Idle,
        }
    }

    /// 推进时间
    pub fn update(&mut self, dt: Duration) -> Vec<TransitionEvent> {
        let mut events = Vec::new();
        if self.is_complete() {
            return events;
        }

        self.elapsed += dt;
        let steps = TransitionTimeline::steps();

        while let Some((offset, step)) = steps.get(self.cursor) {
            if self.elapsed < *offset {
                break;
            }
            if let TransitionStep::Enter(phase) = step {
                self.phase = *phase;
            }
            events.push((*step).into());
            self.cursor += 1;
        }

        events
    }

    pub fn phase(&self) -> TransitionPhase {
        self.phase
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// 完成事件是否已发出
    pub fn is_complete(&self) -> bool {
        self.cursor >= TransitionTimeline::steps().len()
    }

    /// 当前阶段的视觉状态
    pub fn visual(&self) -> TransitionVisual {
        TransitionVisual::for_phase(self.phase, self.origin)
    }
}

/// 某一阶段结束时展示层应达到的视觉状态
///
/// 只约定各阶段的目标值，动画曲线由展示层决定。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionVisual {
    /// 黑色背景不透明度
    pub backdrop_opacity: f32,
    /// 圆球锚点（中心）
    pub anchor: Point,
    /// 圆球缩放
    pub scale: f32,
    /// 是否已变为圆形
    pub rounded: bool,
    /// "NEWS!" 文字是否可见
    pub label_visible: bool,
    /// 页眉揭示遮罩是否播放
    pub header_reveal: bool,
}

impl TransitionVisual {
    pub fn for_phase(phase: TransitionPhase, origin: Point) -> Self {
        match phase {
            TransitionPhase::Idle => Self {
                backdrop_opacity: 0.0,
                anchor: origin,
                scale: 1.0,
                rounded: false,
                label_visible: true,
                header_reveal: false,
            },
            TransitionPhase::Fading => Self {
                backdrop_opacity: 1.0,
                anchor: origin,
                scale: 1.0,
                rounded: false,
                label_visible: true,
                header_reveal: false,
            },
            TransitionPhase::Condensing => Self {
                backdrop_opacity: 1.0,
                anchor: origin,
                scale: CONDENSED_SCALE,
                rounded: true,
                label_visible: false,
                header_reveal: false,
            },
            TransitionPhase::Moving => Self {
                backdrop_opacity: 1.0,
                anchor: DESTINATION,
                scale: CONDENSED_SCALE,
                rounded: true,
                label_visible: false,
                header_reveal: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_phase_windows() {
        assert_eq!(TransitionTimeline::phase_at(ms(0)), TransitionPhase::Idle);
        assert_eq!(TransitionTimeline::phase_at(ms(99)), TransitionPhase::Idle);
        assert_eq!(TransitionTimeline::phase_at(ms(100)), TransitionPhase::Fading);
        assert_eq!(TransitionTimeline::phase_at(ms(1099)), TransitionPhase::Fading);
        assert_eq!(
            TransitionTimeline::phase_at(ms(1100)),
            TransitionPhase::Condensing
        );
        assert_eq!(TransitionTimeline::phase_at(ms(2100)), TransitionPhase::Moving);
        assert_eq!(TransitionTimeline::phase_at(ms(9000)), TransitionPhase::Moving);

        assert!(!TransitionTimeline::is_complete_at(ms(3599)));
        assert!(TransitionTimeline::is_complete_at(ms(3600)));
    }

    #[test]
    fn test_steps_are_ordered() {
        let steps = TransitionTimeline::steps();
        assert!(steps.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(steps[3].1, TransitionStep::Complete);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(TransitionPhase::Condensing.legacy_name(), "ball");
        assert_eq!("move".parse::<TransitionPhase>().unwrap(), TransitionPhase::Moving);
        assert_eq!(
            "fading".parse::<TransitionPhase>().unwrap(),
            TransitionPhase::Fading
        );
        assert!("spin".parse::<TransitionPhase>().is_err());
        assert_eq!(TransitionPhase::Moving.next(), None);
    }

    #[test]
    fn test_clock_emits_each_event_once() {
        let mut clock = TransitionClock::new(Point::new(400.0, 300.0));
        let mut events = Vec::new();

        // 16ms 一帧
        for _ in 0..300 {
            events.extend(clock.update(ms(16)));
        }

        assert_eq!(
            events,
            vec![
                TransitionEvent::PhaseChanged(TransitionPhase::Fading),
                TransitionEvent::PhaseChanged(TransitionPhase::Condensing),
                TransitionEvent::PhaseChanged(TransitionPhase::Moving),
                TransitionEvent::Completed,
            ]
        );
        assert!(clock.is_complete());
        assert!(clock.update(ms(1000)).is_empty());
    }

    #[test]
    fn test_clock_large_frame_does_not_skip() {
        let mut clock = TransitionClock::new(Point::default());
        assert!(clock.update(ms(50)).is_empty());

        let events = clock.update(ms(2500));
        assert_eq!(
            events,
            vec![
                TransitionEvent::PhaseChanged(TransitionPhase::Fading),
                TransitionEvent::PhaseChanged(TransitionPhase::Condensing),
                TransitionEvent::PhaseChanged(TransitionPhase::Moving),
            ]
        );
        assert_eq!(clock.phase(), TransitionPhase::Moving);
        assert!(!clock.is_complete());

        assert_eq!(clock.update(ms(1050)), vec![TransitionEvent::Completed]);
    }

    #[test]
    fn test_visual_converges_on_destination() {
        let origin = Point::new(640.0, 360.0);

        let idle = TransitionVisual::for_phase(TransitionPhase::Idle, origin);
        assert_eq!(idle.anchor, origin);
        assert!(idle.label_visible);
        assert_eq!(idle.backdrop_opacity, 0.0);

        let condensing = TransitionVisual::for_phase(TransitionPhase::Condensing, origin);
        assert_eq!(condensing.anchor, origin);
        assert!(condensing.rounded);
        assert!(!condensing.label_visible);

        let moving = TransitionVisual::for_phase(TransitionPhase::Moving, origin);
        assert_eq!(moving.anchor, DESTINATION);
        assert!(moving.header_reveal);
    }
}
