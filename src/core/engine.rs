//! 引擎主入口
//!
//! 负责日志、配置、窗口与 GPU 后端的初始化，然后把控制权交给帧调度器。

use tracing_subscriber::EnvFilter;

use super::error::EngineResult;
use super::scheduler::{FrameScheduler, SystemClock};
use crate::config::{EngineConfig, LoggingConfig};
use crate::platform::winit::WinitPlatform;
use crate::render::particles::{ParticleSystem, WORKGROUP_SIZE};
use crate::render::wgpu::WgpuBackend;
use crate::resources::{load_image, radial_sprite, ImageData};

/// 程序生成的粒子贴图边长
const SPRITE_SIZE: u32 = 64;

/// 引擎
///
/// 所有初始化失败都是致命的：`run` 直接返回错误，不做部分恢复。
///
/// # 示例
///
/// ```no_run
/// use sph_toon::core::Engine;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     Engine::run()?;
///     Ok(())
/// }
/// ```
pub struct Engine;

impl Engine {
    /// 加载配置并运行直到退出
    pub fn run() -> EngineResult<()> {
        let mut config = EngineConfig::load_or_default()?;
        config.apply_env_overrides();
        Self::initialize_logging(&config.logging);
        config.validate()?;

        Self::run_with_config(&config)
    }

    /// 以给定配置运行
    pub fn run_with_config(config: &EngineConfig) -> EngineResult<()> {
        tracing::info!(target: "engine", "Engine starting");

        let sprite = Self::load_sprite(config)?;
        let platform = WinitPlatform::new(&config.graphics)?;
        let backend = pollster::block_on(WgpuBackend::new(
            platform.window(),
            &config.graphics,
            &config.camera,
            &sprite,
        ))?;
        tracing::info!(
            target: "engine",
            "Using adapter '{}'",
            backend.adapter_name()
        );

        let mut system = ParticleSystem::new(backend, config)?;
        let (width, height) = platform.size();
        system.resize(width, height);
        tracing::info!(
            target: "engine",
            "{} particles, {} per workgroup",
            system.particle_count(),
            WORKGROUP_SIZE
        );

        let mut scheduler = FrameScheduler::new(platform, system, SystemClock::new(), config);
        let result = scheduler.run();

        let (_platform, system) = scheduler.into_parts();
        drop(system.shutdown());
        tracing::info!(target: "engine", "Engine stopped");
        result
    }

    /// 初始化日志
    ///
    /// `RUST_LOG` 优先，否则使用配置中的级别。重复调用是安全的。
    pub fn initialize_logging(logging: &LoggingConfig) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(logging.level.as_filter()));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    fn load_sprite(config: &EngineConfig) -> EngineResult<ImageData> {
        match &config.particles.texture_path {
            Some(path) => Ok(load_image(path)?),
            None => Ok(radial_sprite(SPRITE_SIZE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_initialize_logging_twice() {
        let logging = LoggingConfig {
            level: LogLevel::Debug,
        };
        Engine::initialize_logging(&logging);
        Engine::initialize_logging(&logging);
    }

    #[test]
    fn test_default_sprite_is_procedural() {
        let sprite = Engine::load_sprite(&EngineConfig::default()).unwrap();
        assert_eq!((sprite.width, sprite.height), (SPRITE_SIZE, SPRITE_SIZE));
    }

    #[test]
    fn test_missing_sprite_is_fatal() {
        let mut config = EngineConfig::default();
        config.particles.texture_path = Some("does/not/exist.png".to_string());
        assert!(Engine::load_sprite(&config).is_err());
    }
}
