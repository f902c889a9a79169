//! 帧调度
//!
//! 两个相互独立的时钟：
//!
//! - 固定间隔的逻辑 tick 累加器：驱动输入轮询与时间步逻辑，每帧最多追赶 `max_frameskip` 次
//! - 墙钟帧间隔：作为相机更新与渲染的 `dt`
//!
//! 时间通过 [`Clock`] 注入，输入通过 [`Platform`] 注入，因此调度器可以在无窗口环境下驱动。

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::config::{EngineConfig, SimulationConfig};
use crate::core::error::EngineResult;
use crate::platform::{KeyCode, MouseButton, Platform};
use crate::render::backend::{FrameStatus, GpuBackend};
use crate::render::particles::ParticleSystem;

/// FPS 采样窗口
pub const FPS_WINDOW: Duration = Duration::from_millis(1000);

// ============================================================================
// Clocks
// ============================================================================

/// 单调时钟
pub trait Clock {
    /// 自某个固定起点以来经过的时间
    fn now(&self) -> Duration;
}

/// 系统单调时钟
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// 手动推进的时钟
///
/// 克隆体共享同一时间值：调度器持有一份，测试持有另一份并推进它。
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 前进 `by`
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// 设置为绝对时间
    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

// ============================================================================
// Time Controller
// ============================================================================

/// 时间步覆盖状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideState {
    /// 使用基础时间步
    Idle,
    /// 覆盖按钮按住中，时间步固定为覆盖值
    Overridden,
}

/// 时间步控制器
///
/// 基础时间步在冻结（0）与运行（`running_step`）之间由边沿触发切换；
/// 覆盖按钮是电平触发的，松开后回到切换后的基础值。
#[derive(Debug, Clone)]
pub struct TimeController {
    running_step: f32,
    override_step: f32,
    frozen: bool,
    state: OverrideState,
}

impl TimeController {
    /// 创建时间步控制器
    ///
    /// 负的步长按 0 处理。
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            running_step: config.running_step.max(0.0),
            override_step: config.override_step.max(0.0),
            frozen: config.start_frozen,
            state: OverrideState::Idle,
        }
    }

    /// 处理一次 tick 的输入
    ///
    /// # 参数
    /// - `override_held`: 覆盖按钮当前是否按住（电平）
    /// - `toggle_pressed`: 冻结切换键是否在本次轮询中刚按下（边沿）
    pub fn update(&mut self, override_held: bool, toggle_pressed: bool) {
        self.state = match (self.state, override_held) {
            (OverrideState::Idle, true) => {
                tracing::debug!(target: "simulation", "Time step override engaged");
                OverrideState::Overridden
            }
            (OverrideState::Overridden, false) => {
                tracing::debug!(target: "simulation", "Time step override released");
                OverrideState::Idle
            }
            (state, _) => state,
        };

        if toggle_pressed {
            self.frozen = !self.frozen;
            tracing::info!(
                target: "simulation",
                "Simulation {}",
                if self.frozen { "frozen" } else { "running" }
            );
        }
    }

    /// 当前有效时间步（不为负）
    pub fn step(&self) -> f32 {
        match self.state {
            OverrideState::Overridden => self.override_step,
            OverrideState::Idle if self.frozen => 0.0,
            OverrideState::Idle => self.running_step,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn state(&self) -> OverrideState {
        self.state
    }
}

// ============================================================================
// Camera Warm-up
// ============================================================================

/// 相机预热
///
/// 启动后的前若干帧不更新相机，之后持续更新。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraWarmup {
    /// 还需跳过的帧数
    Warming(u32),
    /// 每帧更新相机
    Active,
}

impl CameraWarmup {
    pub fn new(frames: u32) -> Self {
        Self::Warming(frames)
    }

    /// 推进一帧
    ///
    /// # 返回
    /// 本帧是否应更新相机
    pub fn tick(&mut self) -> bool {
        match *self {
            Self::Warming(0) => {
                tracing::debug!(target: "scheduler", "Camera warm-up finished");
                *self = Self::Active;
                true
            }
            Self::Warming(remaining) => {
                *self = Self::Warming(remaining - 1);
                false
            }
            Self::Active => true,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

// ============================================================================
// FPS Counter
// ============================================================================

/// 滚动 1 秒 FPS 计数
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Duration,
    frames: u32,
    latest: Option<u32>,
}

impl FpsCounter {
    pub fn new(now: Duration) -> Self {
        Self {
            window_start: now,
            frames: 0,
            latest: None,
        }
    }

    /// 记录一帧
    ///
    /// 距上次采样已满 1000 ms 时，先输出本窗口内累积的帧数并清零，再计入当前帧。
    ///
    /// # 返回
    /// 本次产生的采样值（如果有）
    pub fn record_frame(&mut self, now: Duration) -> Option<u32> {
        let sample = if now.saturating_sub(self.window_start) >= FPS_WINDOW {
            let sample = self.frames;
            self.window_start = now;
            self.frames = 0;
            self.latest = Some(sample);
            Some(sample)
        } else {
            None
        };
        self.frames += 1;
        sample
    }

    /// 当前窗口内已计入的帧数
    pub fn frames_in_window(&self) -> u32 {
        self.frames
    }

    /// 最近一次采样值
    pub fn latest(&self) -> Option<u32> {
        self.latest
    }
}

// ============================================================================
// Frame Scheduler
// ============================================================================

/// 帧调度器
///
/// 每次外层迭代：追赶逻辑 tick（轮询输入、退出/冻结/覆盖/标题切换、窗口尺寸），
/// 然后以墙钟 `dt` 更新相机与吸引点，渲染一帧并呈现。
pub struct FrameScheduler<P: Platform, B: GpuBackend, C: Clock> {
    platform: P,
    system: ParticleSystem<B>,
    clock: C,
    time: TimeController,
    warmup: CameraWarmup,
    fps: FpsCounter,
    tick_interval: Duration,
    max_frameskip: u32,
    start: Duration,
    next_tick: Duration,
    last_frame: Duration,
    show_fps: bool,
    running: bool,
}

impl<P: Platform, B: GpuBackend, C: Clock> FrameScheduler<P, B, C> {
    /// 创建帧调度器
    ///
    /// # 参数
    /// - `platform`: 输入与窗口
    /// - `system`: 粒子系统
    /// - `clock`: 时钟
    /// - `config`: 引擎配置（读取 `simulation` 与 `camera.warmup_frames`）
    pub fn new(platform: P, system: ParticleSystem<B>, clock: C, config: &EngineConfig) -> Self {
        let now = clock.now();
        let ticks_per_second = config.simulation.ticks_per_second.max(1);

        Self {
            platform,
            system,
            time: TimeController::new(&config.simulation),
            warmup: CameraWarmup::new(config.camera.warmup_frames),
            fps: FpsCounter::new(now),
            tick_interval: Duration::from_secs(1) / ticks_per_second,
            max_frameskip: config.simulation.max_frameskip.max(1),
            start: now,
            next_tick: now,
            last_frame: now,
            show_fps: false,
            running: true,
            clock,
        }
    }

    /// 运行直到观察到退出条件
    pub fn run(&mut self) -> EngineResult<()> {
        tracing::info!(
            target: "scheduler",
            "Frame loop started: tick interval {:?}, max frameskip {}",
            self.tick_interval,
            self.max_frameskip
        );

        while self.run_frame()? {}

        tracing::info!(
            target: "scheduler",
            "Frame loop stopped after {} rendered frames",
            self.system.frames_rendered()
        );
        Ok(())
    }

    /// 执行一次外层迭代
    ///
    /// # 返回
    /// 观察到退出条件时返回 false（本次迭代不再渲染）
    pub fn run_frame(&mut self) -> EngineResult<bool> {
        let mut ticks = 0;
        while self.clock.now() > self.next_tick && ticks < self.max_frameskip {
            self.tick()?;
            self.next_tick += self.tick_interval;
            ticks += 1;
        }

        if !self.running {
            return Ok(false);
        }

        let now = self.clock.now();
        let dt = now.saturating_sub(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let update_camera = self.warmup.tick();
        let mouse_delta = self.platform.input_mut().take_mouse_delta();
        if update_camera {
            self.system
                .update_camera(dt, self.platform.input(), mouse_delta);
        }
        self.system
            .update_attractor(self.platform.input().button_down(MouseButton::Right));

        let elapsed_ms = now.saturating_sub(self.start).as_secs_f32() * 1000.0;
        if self.system.render(dt, elapsed_ms, self.time.step())? == FrameStatus::Ready {
            if let Some(sample) = self.fps.record_frame(now) {
                tracing::debug!(target: "scheduler", "FPS: {}", sample);
                if self.show_fps {
                    self.platform.set_title(&format!("{} FPS", sample));
                }
            }
            self.system.present()?;
        }

        Ok(true)
    }

    fn tick(&mut self) -> EngineResult<()> {
        self.platform.poll_events()?;

        let input = self.platform.input();
        if input.key_down(KeyCode::Escape) || input.close_requested() {
            self.running = false;
        }
        let override_held = input.button_down(MouseButton::Left);
        let toggle_pressed = input.key_pressed_once(KeyCode::Space);
        let title_toggled = input.key_pressed_once(KeyCode::Tab);

        self.time.update(override_held, toggle_pressed);

        if title_toggled {
            self.show_fps = !self.show_fps;
            let title = match (self.show_fps, self.fps.latest()) {
                (true, Some(sample)) => format!("{} FPS", sample),
                _ => self.platform.default_title().to_string(),
            };
            self.platform.set_title(&title);
        }

        if let Some((width, height)) = self.platform.take_resize() {
            self.system.resize(width, height);
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn shows_fps(&self) -> bool {
        self.show_fps
    }

    pub fn time_controller(&self) -> &TimeController {
        &self.time
    }

    pub fn warmup(&self) -> CameraWarmup {
        self.warmup
    }

    pub fn fps(&self) -> &FpsCounter {
        &self.fps
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn system(&self) -> &ParticleSystem<B> {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut ParticleSystem<B> {
        &mut self.system
    }

    /// 拆出平台与粒子系统（用于退出后的清理）
    pub fn into_parts(self) -> (P, ParticleSystem<B>) {
        (self.platform, self.system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sim_config() -> SimulationConfig {
        SimulationConfig::default()
    }

    #[test]
    fn test_time_controller_starts_frozen() {
        let controller = TimeController::new(&sim_config());
        assert!(controller.is_frozen());
        assert_eq!(controller.step(), 0.0);
    }

    #[test]
    fn test_toggle_is_edge_triggered() {
        let mut controller = TimeController::new(&sim_config());
        controller.update(false, true);
        assert_eq!(controller.step(), 0.01);
        // 按住期间不再有边沿
        for _ in 0..5 {
            controller.update(false, false);
        }
        assert_eq!(controller.step(), 0.01);
        controller.update(false, true);
        assert_eq!(controller.step(), 0.0);
    }

    #[test]
    fn test_override_reverts_to_base() {
        let mut controller = TimeController::new(&sim_config());
        controller.update(false, true);
        controller.update(true, false);
        assert_eq!(controller.state(), OverrideState::Overridden);
        assert_eq!(controller.step(), 0.1);
        controller.update(true, false);
        assert_eq!(controller.step(), 0.1);
        controller.update(false, false);
        assert_eq!(controller.state(), OverrideState::Idle);
        assert_eq!(controller.step(), 0.01);
    }

    #[test]
    fn test_toggle_while_overridden_changes_base() {
        let mut controller = TimeController::new(&sim_config());
        controller.update(true, true);
        assert_eq!(controller.step(), 0.1);
        controller.update(false, false);
        assert_eq!(controller.step(), 0.01);
    }

    #[test]
    fn test_warmup_skips_configured_frames() {
        let mut warmup = CameraWarmup::new(10);
        let updates: Vec<bool> = (0..12).map(|_| warmup.tick()).collect();
        assert!(updates[..10].iter().all(|u| !u));
        assert!(updates[10] && updates[11]);
        assert!(warmup.is_active());
    }

    #[test]
    fn test_warmup_zero_is_immediate() {
        let mut warmup = CameraWarmup::new(0);
        assert!(warmup.tick());
    }

    #[test]
    fn test_fps_counter_window() {
        let mut fps = FpsCounter::new(Duration::ZERO);
        for i in 0..60u64 {
            assert_eq!(fps.record_frame(Duration::from_millis(i * 16)), None);
        }
        assert_eq!(fps.record_frame(Duration::from_millis(1000)), Some(60));
        assert_eq!(fps.frames_in_window(), 1);
        assert_eq!(fps.latest(), Some(60));
        assert_eq!(fps.record_frame(Duration::from_millis(1500)), None);
    }

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new();
        let other = clock.clone();
        other.advance(Duration::from_millis(40));
        assert_eq!(clock.now(), Duration::from_millis(40));
        clock.set(Duration::from_secs(2));
        assert_eq!(other.now(), Duration::from_secs(2));
    }

    proptest! {
        #[test]
        fn prop_step_never_negative(
            running in -1.0f32..1.0,
            overridden in -1.0f32..1.0,
            inputs in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..64),
        ) {
            let config = SimulationConfig {
                running_step: running,
                override_step: overridden,
                ..SimulationConfig::default()
            };
            let mut controller = TimeController::new(&config);
            for (held, pressed) in inputs {
                controller.update(held, pressed);
                prop_assert!(controller.step() >= 0.0);
            }
        }

        #[test]
        fn prop_one_toggle_per_press(presses in 0usize..20, held_frames in 1usize..8) {
            let mut controller = TimeController::new(&SimulationConfig::default());
            for _ in 0..presses {
                controller.update(false, true);
                for _ in 1..held_frames {
                    controller.update(false, false);
                }
            }
            prop_assert_eq!(controller.is_frozen(), presses % 2 == 0);
        }
    }
}
