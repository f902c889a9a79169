//! 核心模块
//!
//! 包含引擎的核心功能：
//! - `engine` - 主引擎入口
//! - `scheduler` - 固定 tick 累加器与帧调度
//! - `error` - 错误类型定义

pub mod engine;
pub mod error;
pub mod scheduler;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    AssetError, AssetResult, EngineError, EngineResult, PlatformError, PlatformResult,
    RenderError, RenderResult,
};

// 重新导出主要类型
pub use engine::Engine;
pub use scheduler::{
    CameraWarmup, Clock, FpsCounter, FrameScheduler, ManualClock, OverrideState, SystemClock,
    TimeController,
};
