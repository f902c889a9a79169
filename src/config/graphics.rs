use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// 窗口宽度（像素）
    pub width: u32,

    /// 窗口高度（像素）
    pub height: u32,

    /// 全屏模式
    pub fullscreen: bool,

    /// 垂直同步
    pub vsync: bool,

    /// 默认窗口标题
    pub title: String,
}

impl_default!(GraphicsConfig {
    width: 1280,
    height: 720,
    fullscreen: false,
    vsync: true,
    title: "SPH Cartoon Particles".to_string(),
});

impl GraphicsConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ValidationError(
                "Invalid resolution".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_resolution_rejected() {
        let mut config = GraphicsConfig::default();
        config.height = 0;
        assert!(config.validate().is_err());
    }
}
