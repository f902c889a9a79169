use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 粒子缓冲配置
///
/// `count` 在构建时确定粒子缓冲容量，运行期间不可变。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// 粒子数量 N
    pub count: u32,

    /// 初始分布球半径
    pub init_radius: f32,

    /// 屏幕空间四边形边长（quadLength）
    pub size: f32,

    /// 粒子精灵纹理路径（None = 程序生成的圆形精灵）
    pub texture_path: Option<String>,
}

impl_default!(ParticleConfig {
    count: 8192,
    init_radius: 5.0,
    size: 0.15,
    texture_path: None,
});

impl ParticleConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.count == 0 {
            return Err(ConfigError::ValidationError(
                "Particle count must be greater than zero".to_string(),
            ));
        }
        if !(self.init_radius > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid initial radius: {}",
                self.init_radius
            )));
        }
        if !(self.size > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid particle size: {}",
                self.size
            )));
        }
        Ok(())
    }
}
