//! 统一错误处理模块
//!
//! 提供引擎范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **初始化错误**: 设备、表面、着色器、纹理解码等，全部为致命错误
//! - **帧内错误**: 仅表面获取失败一类，丢失/过期时重新配置并跳过当前帧
//!
//! `EngineError` 汇总所有子系统错误，由 `main` 统一报告后退出。

use crate::config::ConfigError;
use thiserror::Error;

/// 引擎核心错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// 渲染系统错误
#[derive(Error, Debug, Clone)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    SurfaceCreation(String),

    #[error("Failed to request adapter: no compatible GPU found")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    DeviceRequest(String),

    #[error("Failed to compile shader '{label}': {reason}")]
    ShaderCompilation { label: String, reason: String },

    #[error("Failed to link pipeline '{label}': {reason}")]
    PipelineLink { label: String, reason: String },

    #[error("Surface error: {0}")]
    Surface(String),

    #[error("Invalid render state: {0}")]
    InvalidState(String),
}

/// 资源加载错误
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset not found: {path}")]
    NotFound { path: String },

    #[error("Failed to decode asset: {path}, reason: {reason}")]
    Decode { path: String, reason: String },
}

/// 平台层错误
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),

    #[error("Event loop error: {0}")]
    EventLoop(String),
}

/// 引擎结果类型别名
pub type EngineResult<T> = Result<T, EngineError>;
pub type RenderResult<T> = Result<T, RenderError>;
pub type AssetResult<T> = Result<T, AssetError>;
pub type PlatformResult<T> = Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let asset_err = AssetError::NotFound {
            path: "particle.tga".to_string(),
        };
        let engine_err: EngineError = asset_err.into();
        assert!(matches!(engine_err, EngineError::Asset(_)));

        let config_err = ConfigError::ValidationError("count".to_string());
        let engine_err: EngineError = config_err.into();
        assert!(matches!(engine_err, EngineError::Config(_)));

        let platform_err = PlatformError::WindowCreation("no display".to_string());
        let engine_err: EngineError = platform_err.into();
        assert_eq!(
            engine_err.to_string(),
            "Platform error: Window creation failed: no display"
        );
    }

    #[test]
    fn test_error_display() {
        let err = RenderError::NoAdapter;
        assert_eq!(
            err.to_string(),
            "Failed to request adapter: no compatible GPU found"
        );

        let err = RenderError::ShaderCompilation {
            label: "simulate.wgsl".to_string(),
            reason: "unknown identifier".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to compile shader 'simulate.wgsl': unknown identifier"
        );
    }
}
