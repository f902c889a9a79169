use std::sync::Arc;
use std::time::Duration;

use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{CursorGrabMode, Fullscreen, Window as WinitWindowRaw, WindowBuilder};

use super::{InputEvent, InputState, KeyCode, MouseButton, Platform};
use crate::config::GraphicsConfig;
use crate::core::error::{PlatformError, PlatformResult};

/// 基于 winit 的平台实现
///
/// 使用 `pump_events` 由应用驱动事件循环，每次 `poll_events` 只处理当前已到达的事件。
pub struct WinitPlatform {
    event_loop: EventLoop<()>,
    window: Arc<WinitWindowRaw>,
    input: InputState,
    pending_resize: Option<(u32, u32)>,
    default_title: String,
}

impl WinitPlatform {
    /// 创建窗口并锁定鼠标
    pub fn new(config: &GraphicsConfig) -> PlatformResult<Self> {
        let event_loop =
            EventLoop::new().map_err(|e| PlatformError::EventLoop(e.to_string()))?;

        let fullscreen = config.fullscreen.then_some(Fullscreen::Borderless(None));
        let window = WindowBuilder::new()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .with_fullscreen(fullscreen)
            .build(&event_loop)
            .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;

        let grab = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(e) = grab {
            tracing::warn!(target: "engine", "Cursor grab unavailable: {}", e);
        }
        window.set_cursor_visible(false);

        Ok(Self {
            event_loop,
            window: Arc::new(window),
            input: InputState::new(),
            pending_resize: None,
            default_title: config.title.clone(),
        })
    }

    /// 共享窗口句柄（用于创建 `wgpu::Surface<'static>`）
    pub fn window(&self) -> Arc<WinitWindowRaw> {
        Arc::clone(&self.window)
    }

    /// 当前内部尺寸
    pub fn size(&self) -> (u32, u32) {
        let s = self.window.inner_size();
        (s.width, s.height)
    }
}

impl Platform for WinitPlatform {
    fn poll_events(&mut self) -> PlatformResult<()> {
        self.input.begin_poll();

        let input = &mut self.input;
        let pending_resize = &mut self.pending_resize;
        let status = self
            .event_loop
            .pump_events(Some(Duration::ZERO), |event, _target| {
                if let Some(event) = translate_event(event) {
                    if let InputEvent::WindowResized { width, height } = event {
                        *pending_resize = Some((width, height));
                    }
                    input.apply(&event);
                }
            });

        if let PumpStatus::Exit(code) = status {
            tracing::debug!(target: "engine", "Event loop exited with code {}", code);
            self.input.apply(&InputEvent::WindowCloseRequested);
        }
        Ok(())
    }

    fn input(&self) -> &InputState {
        &self.input
    }

    fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    fn take_resize(&mut self) -> Option<(u32, u32)> {
        self.pending_resize.take()
    }

    fn set_title(&mut self, title: &str) {
        self.window.set_title(title);
    }

    fn default_title(&self) -> &str {
        &self.default_title
    }
}

fn translate_event(event: Event<()>) -> Option<InputEvent> {
    match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => Some(InputEvent::WindowCloseRequested),
            WindowEvent::Resized(size) => Some(InputEvent::WindowResized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::Focused(focused) => Some(InputEvent::WindowFocused(focused)),
            WindowEvent::KeyboardInput { event, .. } => {
                let key = match event.physical_key {
                    PhysicalKey::Code(code) => map_key(code),
                    PhysicalKey::Unidentified(_) => return None,
                };
                Some(match event.state {
                    ElementState::Pressed => InputEvent::KeyPressed {
                        key,
                        repeat: event.repeat,
                    },
                    ElementState::Released => InputEvent::KeyReleased { key },
                })
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = map_button(button);
                Some(match state {
                    ElementState::Pressed => InputEvent::MouseButtonPressed { button },
                    ElementState::Released => InputEvent::MouseButtonReleased { button },
                })
            }
            _ => None,
        },
        Event::DeviceEvent {
            event: DeviceEvent::MouseMotion { delta },
            ..
        } => Some(InputEvent::MouseMotion {
            delta_x: delta.0 as f32,
            delta_y: delta.1 as f32,
        }),
        _ => None,
    }
}

fn map_key(code: WinitKeyCode) -> KeyCode {
    match code {
        WinitKeyCode::KeyW => KeyCode::W,
        WinitKeyCode::KeyA => KeyCode::A,
        WinitKeyCode::KeyS => KeyCode::S,
        WinitKeyCode::KeyD => KeyCode::D,
        WinitKeyCode::KeyQ => KeyCode::Q,
        WinitKeyCode::KeyE => KeyCode::E,
        WinitKeyCode::Escape => KeyCode::Escape,
        WinitKeyCode::Tab => KeyCode::Tab,
        WinitKeyCode::Space => KeyCode::Space,
        WinitKeyCode::ShiftLeft | WinitKeyCode::ShiftRight => KeyCode::Shift,
        _ => KeyCode::Other,
    }
}

fn map_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Back => MouseButton::Other(3),
        winit::event::MouseButton::Forward => MouseButton::Other(4),
        winit::event::MouseButton::Other(id) => MouseButton::Other(id),
    }
}
