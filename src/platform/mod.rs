pub mod winit;

use std::collections::HashSet;

use crate::core::error::PlatformResult;

// ============================================================================
// Input Abstraction
// ============================================================================

/// 平台输入事件（由具体平台从原生事件翻译而来）
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Keyboard
    KeyPressed { key: KeyCode, repeat: bool },
    KeyReleased { key: KeyCode },

    // Mouse
    MouseButtonPressed { button: MouseButton },
    MouseButtonReleased { button: MouseButton },
    MouseMotion { delta_x: f32, delta_y: f32 },

    // Window
    WindowResized { width: u32, height: u32 },
    WindowFocused(bool),
    WindowCloseRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    W, A, S, D, Q, E,
    Escape, Tab, Space, Shift,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left, Right, Middle, Other(u16),
}

/// 输入状态
///
/// 同时提供两种互不替代的查询语义：
/// - 电平（level）：`key_down` / `button_down`，只要按住就为真
/// - 边沿（edge）：`key_pressed_once` / `button_pressed_once`，只在按下发生的那次轮询为真，
///   按住期间的系统自动重复不会再次触发
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    buttons_pressed: HashSet<MouseButton>,
    mouse_delta: (f32, f32),
    close_requested: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始新一轮轮询：清空上一轮的边沿状态
    pub fn begin_poll(&mut self) {
        self.keys_pressed.clear();
        self.buttons_pressed.clear();
    }

    /// 应用一个输入事件
    pub fn apply(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyPressed { key, repeat } => {
                // insert 返回 false 说明按键已处于按下状态
                if self.keys_down.insert(*key) && !repeat {
                    self.keys_pressed.insert(*key);
                }
            }
            InputEvent::KeyReleased { key } => {
                self.keys_down.remove(key);
            }
            InputEvent::MouseButtonPressed { button } => {
                if self.buttons_down.insert(*button) {
                    self.buttons_pressed.insert(*button);
                }
            }
            InputEvent::MouseButtonReleased { button } => {
                self.buttons_down.remove(button);
            }
            InputEvent::MouseMotion { delta_x, delta_y } => {
                self.mouse_delta.0 += delta_x;
                self.mouse_delta.1 += delta_y;
            }
            InputEvent::WindowFocused(false) => {
                // 失去焦点时收不到释放事件
                self.keys_down.clear();
                self.buttons_down.clear();
            }
            InputEvent::WindowCloseRequested => {
                self.close_requested = true;
            }
            InputEvent::WindowFocused(true) | InputEvent::WindowResized { .. } => {}
        }
    }

    /// 按键当前是否按下（电平）
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// 按键是否在本轮轮询中刚被按下（边沿）
    pub fn key_pressed_once(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// 鼠标按钮当前是否按下（电平）
    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// 鼠标按钮是否在本轮轮询中刚被按下（边沿）
    pub fn button_pressed_once(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    /// 取出自上次取出以来累积的鼠标位移
    pub fn take_mouse_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.mouse_delta)
    }

    /// 窗口是否请求关闭
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }
}

// ============================================================================
// Platform Abstraction
// ============================================================================

/// 平台抽象：事件轮询、窗口尺寸变化与标题
///
/// 帧调度器只通过该 trait 与窗口系统交互，因此可以用脚本化的实现在无窗口环境下驱动。
pub trait Platform {
    /// 轮询并处理所有待处理事件，更新输入状态
    fn poll_events(&mut self) -> PlatformResult<()>;

    /// 当前输入状态
    fn input(&self) -> &InputState;

    /// 当前输入状态（可变）
    fn input_mut(&mut self) -> &mut InputState;

    /// 取出最近一次窗口尺寸变化（如果有）
    fn take_resize(&mut self) -> Option<(u32, u32)>;

    /// 设置窗口标题
    fn set_title(&mut self, title: &str);

    /// 默认窗口标题
    fn default_title(&self) -> &str;
}
