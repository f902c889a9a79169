//! 统一配置系统
//!
//! 启动时加载一次：TOML/JSON配置文件、环境变量覆盖、校验

use crate::impl_default;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod camera;
pub mod graphics;
pub mod particles;
pub mod simulation;

pub use camera::CameraConfig;
pub use graphics::GraphicsConfig;
pub use particles::ParticleConfig;
pub use simulation::SimulationConfig;

/// 引擎配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 引擎主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 窗口与图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 粒子缓冲配置
    #[serde(default)]
    pub particles: ParticleConfig,

    /// 相机配置
    #[serde(default)]
    pub camera: CameraConfig,

    /// 模拟时间步与帧调度配置
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// 按给定的查找函数覆盖配置（便于测试注入）
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(width) = lookup("SPH_WIDTH").and_then(|v| v.parse().ok()) {
            self.graphics.width = width;
        }
        if let Some(height) = lookup("SPH_HEIGHT").and_then(|v| v.parse().ok()) {
            self.graphics.height = height;
        }
        if let Some(fullscreen) = lookup("SPH_FULLSCREEN").and_then(|v| v.parse().ok()) {
            self.graphics.fullscreen = fullscreen;
        }
        if let Some(vsync) = lookup("SPH_VSYNC").and_then(|v| v.parse().ok()) {
            self.graphics.vsync = vsync;
        }
        if let Some(count) = lookup("SPH_PARTICLES").and_then(|v| v.parse().ok()) {
            self.particles.count = count;
        }
        if let Some(size) = lookup("SPH_PARTICLE_SIZE").and_then(|v| v.parse().ok()) {
            self.particles.size = size;
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.graphics.validate()?;
        self.particles.validate()?;
        self.camera.validate()?;
        self.simulation.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./config.toml
    /// 2. ./config.json
    /// 3. ~/.config/sph_toon/config.toml
    /// 4. 使用默认配置
    ///
    /// 找到的文件解析失败时直接返回错误，不会静默回退到默认值。
    pub fn load_or_default() -> ConfigResult<Self> {
        let mut candidates = vec![PathBuf::from("config.toml"), PathBuf::from("config.json")];
        if let Some(home) = env::var_os("HOME") {
            candidates.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("sph_toon")
                    .join("config.toml"),
            );
        }

        for path in candidates {
            if !path.exists() {
                continue;
            }
            let config = if path.extension().is_some_and(|ext| ext == "json") {
                Self::from_json_file(&path)?
            } else {
                Self::from_toml_file(&path)?
            };
            tracing::info!(target: "config", "Loaded config from {:?}", path);
            return Ok(config);
        }

        tracing::info!(target: "config", "Using default configuration");
        Ok(Self::default())
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 优先）
    pub level: LogLevel,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// 转换为 `EnvFilter` 指令
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
