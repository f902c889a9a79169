//! 渲染模块
//!
//! - `backend` - GPU 后端抽象与记录型后端
//! - `particles` - 粒子存储、模拟阶段与顶层粒子系统
//! - `graph` - 深度预通道 / 主通道 / 描边合成三段渲染图
//! - `camera` - 第一人称相机
//! - `wgpu` - 基于 wgpu 的后端实现

pub mod backend;
pub mod camera;
pub mod graph;
pub mod offscreen;
pub mod particles;
pub mod postprocess;
pub mod shader;
pub mod wgpu;

// Re-export backend types
pub use backend::{
    BarrierBits, BufferHandle, FrameStatus, GpuBackend, GpuCommand, LoadOp, RecordingBackend,
    RenderPassDesc, RenderTarget,
};

// Re-export frame-level types
pub use camera::FirstPersonCamera;
pub use graph::{FrameUniforms, RenderGraph, RenderStage};
pub use particles::{GpuParticle, ParticleStore, ParticleSystem};
pub use postprocess::{CompositeBlend, OutlineSettings};
pub use self::wgpu::WgpuBackend;
