use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 模拟时间步与帧调度配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 运行状态下的时间步
    pub running_step: f32,

    /// 按住覆盖按钮时固定的时间步
    pub override_step: f32,

    /// 启动时是否处于冻结状态（时间步 = 0）
    pub start_frozen: bool,

    /// 逻辑 tick 频率
    pub ticks_per_second: u32,

    /// 每帧最多追赶的 tick 数
    pub max_frameskip: u32,

    /// 吸引点距相机的距离
    pub attractor_distance: f32,

    /// 吸引点强度
    pub attractor_strength: f32,
}

impl_default!(SimulationConfig {
    running_step: 0.01,
    override_step: 0.1,
    start_frozen: true,
    ticks_per_second: 25,
    max_frameskip: 5,
    attractor_distance: 10.0,
    attractor_strength: 40.0,
});

impl SimulationConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.running_step >= 0.0) || !(self.override_step >= 0.0) {
            return Err(ConfigError::ValidationError(
                "Time steps must be non-negative".to_string(),
            ));
        }
        if self.ticks_per_second == 0 {
            return Err(ConfigError::ValidationError(
                "ticks_per_second must be greater than zero".to_string(),
            ));
        }
        if self.max_frameskip == 0 {
            return Err(ConfigError::ValidationError(
                "max_frameskip must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_step_rejected() {
        let config = SimulationConfig {
            running_step: -0.01,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_frameskip_rejected() {
        let config = SimulationConfig {
            max_frameskip: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
