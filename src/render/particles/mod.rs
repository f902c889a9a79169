//! GPU 粒子模块
//!
//! 粒子完全驻留在 GPU 上：同一块缓冲既是模拟阶段的随机读写存储，又是渲染阶段的顺序顶点源。
//!
//! ## 每帧数据流
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  SimulationStage   pass 1 ─barrier─ pass 2 ─barrier─     │
//! │                    pass 3 ─barrier─                      │
//! │                         (StorageView, 读写)               │
//! ├──────────────────────────────────────────────────────────┤
//! │  RenderGraph       depth pre-pass → main pass → composite │
//! │                         (VertexView, 只读)                │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod attractor;
pub mod simulation;
pub mod store;
pub mod system;

pub use attractor::Attractor;
pub use simulation::{PassDescriptor, SimUniforms, SimulationStage, WORKGROUP_SIZE};
pub use store::{ParticleStore, StorageView, VertexView};
pub use system::ParticleSystem;

/// GPU 粒子记录
///
/// 存储与顶点访问共用同一布局：步长 96 字节，是 16 的整数倍。
/// 中间的模拟字段只由计算着色器读写，不会作为顶点属性暴露。
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuParticle {
    /// 位置（齐次坐标）
    pub position: [f32; 4],
    /// 速度
    pub velocity: [f32; 4],
    /// 合力
    pub force: [f32; 4],
    /// 密度
    pub density: f32,
    /// 压力
    pub pressure: f32,
    /// 质量
    pub mass: f32,
    pub _sim_pad: [f32; 3],
    /// 渲染标量（粒子尺寸）
    pub render_scalar: f32,
    pub _pad: f32,
    /// 颜色
    pub color: [f32; 4],
}

impl GpuParticle {
    /// 记录步长（字节）
    pub const STRIDE: u64 = std::mem::size_of::<GpuParticle>() as u64;

    pub const POSITION_OFFSET: u64 = 0;
    pub const RENDER_SCALAR_OFFSET: u64 = 72;
    pub const COLOR_OFFSET: u64 = 80;

    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = [
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: Self::POSITION_OFFSET,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32,
            offset: Self::RENDER_SCALAR_OFFSET,
            shader_location: 1,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: Self::COLOR_OFFSET,
            shader_location: 2,
        },
    ];

    /// 顶点缓冲布局
    ///
    /// 每个粒子作为一个实例，顶点着色器用 `vertex_index` 0..6 展开成屏幕空间四边形。
    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Self::STRIDE,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        assert_eq!(GpuParticle::STRIDE, 96);
        assert_eq!(GpuParticle::STRIDE % 16, 0);
        assert_eq!(std::mem::align_of::<GpuParticle>(), 4);

        let p = GpuParticle::default();
        let base = &p as *const GpuParticle as usize;
        assert_eq!(&p.render_scalar as *const f32 as usize - base, 72);
        assert_eq!(&p.color as *const [f32; 4] as usize - base, 80);
    }

    #[test]
    fn test_vertex_layout_skips_simulation_fields() {
        let layout = GpuParticle::vertex_layout();
        assert_eq!(layout.array_stride, 96);
        for attribute in layout.attributes {
            // 渲染属性只落在 [0,16) 与 [72,96)
            assert!(attribute.offset < 16 || attribute.offset >= 72);
        }
    }
}
