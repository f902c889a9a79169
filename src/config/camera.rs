use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 相机配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// 移动速度（单位/秒）
    pub speed: f32,

    /// 鼠标灵敏度（弧度/像素）
    pub sensitivity: f32,

    /// 垂直视场角（度）
    pub fov_degrees: f32,

    /// 近裁剪面
    pub near: f32,

    /// 远裁剪面
    pub far: f32,

    /// 初始位置
    pub position: [f32; 3],

    /// 启动后延迟相机更新的帧数
    pub warmup_frames: u32,
}

impl_default!(CameraConfig {
    speed: 10.0,
    sensitivity: 0.0025,
    fov_degrees: 60.0,
    near: 0.1,
    far: 500.0,
    position: [15.0, 10.0, 15.0],
    warmup_frames: 10,
});

impl CameraConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.near > 0.0 && self.near < self.far) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid clip planes: near={}, far={}",
                self.near, self.far
            )));
        }
        if !(self.fov_degrees > 0.0 && self.fov_degrees < 180.0) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid field of view: {}",
                self.fov_degrees
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_planes() {
        let config = CameraConfig {
            near: 10.0,
            far: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
