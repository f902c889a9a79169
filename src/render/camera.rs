use glam::{Mat4, Vec3};

use crate::config::CameraConfig;
use crate::platform::{InputState, KeyCode};

/// 俯仰角限制（约 89°）
const PITCH_LIMIT: f32 = 1.5533;

/// 第一人称相机
///
/// W/S 前后、A/D 平移、Q/E 下降/上升，鼠标控制朝向。
#[derive(Debug, Clone)]
pub struct FirstPersonCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
    /// 垂直视场角（弧度）
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    width: u32,
    height: u32,
}

impl FirstPersonCamera {
    /// 从配置创建相机，初始朝向原点
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::from_array(config.position),
            yaw: 0.0,
            pitch: 0.0,
            speed: config.speed,
            sensitivity: config.sensitivity,
            fov: config.fov_degrees.to_radians(),
            near: config.near,
            far: config.far,
            width: width.max(1),
            height: height.max(1),
        };
        camera.look_at(Vec3::ZERO);
        camera
    }

    /// 朝向目标点
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
    }

    pub fn right(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, self.yaw.cos())
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect(), self.near, self.far)
    }

    /// 当前宽高比
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// 视口尺寸
    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 窗口尺寸变化，立即更新投影；零尺寸（最小化）被忽略
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
    }

    /// 按输入更新相机
    ///
    /// # 参数
    /// - `dt`: 帧间隔（秒）
    /// - `input`: 输入状态（按键电平）
    /// - `mouse_delta`: 自上一帧以来的鼠标位移（像素）
    pub fn update_camera(&mut self, dt: f32, input: &InputState, mouse_delta: (f32, f32)) {
        self.yaw += mouse_delta.0 * self.sensitivity;
        self.pitch = (self.pitch - mouse_delta.1 * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let mut movement = Vec3::ZERO;
        if input.key_down(KeyCode::W) {
            movement += self.forward();
        }
        if input.key_down(KeyCode::S) {
            movement -= self.forward();
        }
        if input.key_down(KeyCode::D) {
            movement += self.right();
        }
        if input.key_down(KeyCode::A) {
            movement -= self.right();
        }
        if input.key_down(KeyCode::E) {
            movement += Vec3::Y;
        }
        if input.key_down(KeyCode::Q) {
            movement -= Vec3::Y;
        }

        if movement.length_squared() > 0.0 {
            let boost = if input.key_down(KeyCode::Shift) { 3.0 } else { 1.0 };
            self.position += movement.normalize() * self.speed * boost * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::InputEvent;

    fn camera() -> FirstPersonCamera {
        FirstPersonCamera::new(&CameraConfig::default(), 800, 600)
    }

    #[test]
    fn test_initially_looks_at_origin() {
        let cam = camera();
        let to_origin = (-cam.position).normalize();
        assert!(cam.forward().dot(to_origin) > 0.999);
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut cam = camera();
        assert!((cam.aspect() - 800.0 / 600.0).abs() < 1e-6);

        cam.resize(1920, 1080);
        assert!((cam.aspect() - 1920.0 / 1080.0).abs() < 1e-6);

        let proj = cam.projection_matrix();
        let projected_aspect = proj.y_axis.y / proj.x_axis.x;
        assert!((projected_aspect - 1920.0 / 1080.0).abs() < 1e-4);

        cam.resize(0, 0);
        assert_eq!(cam.viewport(), (1920, 1080));
    }

    #[test]
    fn test_pitch_clamp() {
        let mut cam = camera();
        cam.update_camera(0.0, &InputState::new(), (0.0, -100_000.0));
        assert!(cam.pitch <= PITCH_LIMIT);
    }

    #[test]
    fn test_forward_movement() {
        let mut cam = camera();
        let start = cam.position;
        let mut input = InputState::new();
        input.apply(&InputEvent::KeyPressed {
            key: KeyCode::W,
            repeat: false,
        });
        cam.update_camera(1.0, &input, (0.0, 0.0));
        let moved = cam.position - start;
        assert!((moved.length() - cam.speed).abs() < 1e-3);
        assert!(moved.normalize().dot(cam.forward()) > 0.999);
    }
}
