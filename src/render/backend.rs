//! 渲染后端抽象
//!
//! 模拟阶段与渲染图只通过 [`GpuBackend`] 发出 GPU 操作，因此同一套帧逻辑既可以驱动
//! wgpu，也可以驱动按顺序记录操作的 [`RecordingBackend`]。
//!
//! ## 顺序约定
//!
//! - 后端按调用顺序执行操作
//! - `memory_barrier` 之前的所有 dispatch 写入，对之后的 dispatch 与绘制可见
//! - 没有屏障时，不保证计算写入与后续读取之间的任何顺序

use std::collections::HashMap;

use super::graph::FrameUniforms;
use super::particles::{GpuParticle, PassDescriptor, SimUniforms, StorageView, VertexView};
use super::postprocess::CompositeBlend;
use crate::core::error::{RenderError, RenderResult};

/// 内存屏障覆盖范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarrierBits(pub u32);

impl BarrierBits {
    /// 着色器存储写入
    pub const SHADER_STORAGE: Self = Self(1);
    /// 顶点属性读取
    pub const VERTEX_ATTRIB_ARRAY: Self = Self(2);

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOr for BarrierBits {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// 抽象缓冲区句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// 渲染目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// 只有深度的离屏目标，尺寸跟随窗口
    DepthPrepass,
    /// 默认呈现目标（交换链）
    Presentation,
}

/// 附件加载操作
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp<T> {
    Clear(T),
    Load,
}

/// 渲染通道描述
///
/// `color` / `depth` 为 `None` 表示该通道不绑定对应附件。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPassDesc {
    pub target: RenderTarget,
    pub color: Option<LoadOp<[f32; 4]>>,
    pub depth: Option<LoadOp<f32>>,
}

/// 帧开始结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// 已获取呈现目标，可以录制本帧
    Ready,
    /// 呈现表面丢失或过期，已重新配置，本帧跳过
    Skipped,
}

/// GPU 后端 Trait
///
/// # 示例
///
/// ```ignore
/// if backend.begin_frame()? == FrameStatus::Ready {
///     stage.run(&mut backend, store.storage_view(), step, &attractor);
///     graph.execute(&mut backend, store.vertex_view(), &uniforms);
///     backend.present()?;
/// }
/// ```
pub trait GpuBackend {
    /// 分配粒子缓冲并写入初始记录（存储 + 顶点双重用途）
    fn create_particle_buffer(&mut self, particles: &[GpuParticle]) -> RenderResult<BufferHandle>;

    /// 销毁缓冲区
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// 开始一帧
    fn begin_frame(&mut self) -> RenderResult<FrameStatus>;

    /// 发出一次计算 dispatch
    fn dispatch(
        &mut self,
        storage: &StorageView<'_>,
        pass: &PassDescriptor,
        uniforms: &SimUniforms,
        groups: u32,
    );

    /// 插入内存屏障
    fn memory_barrier(&mut self, barrier: BarrierBits);

    /// 写入帧 uniform（相机矩阵等）
    fn write_frame_uniforms(&mut self, uniforms: &FrameUniforms);

    /// 开始渲染通道
    fn begin_render_pass(&mut self, desc: RenderPassDesc);

    /// 以点图元绘制全部粒子
    fn draw_particles(&mut self, vertices: &VertexView<'_>);

    /// 绘制全屏四边形
    fn draw_fullscreen(&mut self, vertex_count: u32, blend: CompositeBlend);

    /// 结束渲染通道
    fn end_render_pass(&mut self);

    /// 调整呈现表面与离屏目标尺寸
    fn resize(&mut self, width: u32, height: u32);

    /// 提交并呈现
    fn present(&mut self) -> RenderResult<()>;

    /// 获取后端名称
    fn name(&self) -> &str;
}

/// 记录的 GPU 操作
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateBuffer { buffer: BufferHandle, records: u32 },
    DestroyBuffer { buffer: BufferHandle },
    BeginFrame,
    Dispatch {
        buffer: BufferHandle,
        pass_index: u32,
        groups: u32,
        time_step: f32,
    },
    MemoryBarrier(BarrierBits),
    WriteFrameUniforms(FrameUniforms),
    BeginRenderPass(RenderPassDesc),
    DrawParticles {
        buffer: BufferHandle,
        target: RenderTarget,
        points: u32,
    },
    DrawFullscreen { vertex_count: u32, blend: CompositeBlend },
    EndRenderPass,
    Resize { width: u32, height: u32 },
    Present,
}

/// 记录后端（用于测试与基准）
///
/// 不访问 GPU，只按调用顺序记录每个操作，并校验通道嵌套是否正确。
#[derive(Debug)]
pub struct RecordingBackend {
    commands: Vec<GpuCommand>,
    buffers: HashMap<BufferHandle, u32>,
    next_buffer_id: u64,
    active_pass: Option<RenderTarget>,
    lost_frames: u32,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            buffers: HashMap::new(),
            next_buffer_id: 1,
            active_pass: None,
            lost_frames: 0,
        }
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已记录的操作
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    /// 清空记录（保留缓冲区状态）
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// 存活缓冲区的记录数
    pub fn buffer_len(&self, buffer: BufferHandle) -> Option<u32> {
        self.buffers.get(&buffer).copied()
    }

    /// 存活缓冲区数量
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// 让接下来的 `frames` 次 `begin_frame` 报告表面丢失
    pub fn lose_surface(&mut self, frames: u32) {
        self.lost_frames = frames;
    }
}

impl GpuBackend for RecordingBackend {
    fn create_particle_buffer(&mut self, particles: &[GpuParticle]) -> RenderResult<BufferHandle> {
        let records = u32::try_from(particles.len())
            .map_err(|_| RenderError::InvalidState("Particle buffer too large".to_string()))?;
        let buffer = BufferHandle(self.next_buffer_id);
        self.next_buffer_id += 1;
        self.buffers.insert(buffer, records);
        self.commands.push(GpuCommand::CreateBuffer { buffer, records });
        Ok(buffer)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.commands.push(GpuCommand::DestroyBuffer { buffer });
    }

    fn begin_frame(&mut self) -> RenderResult<FrameStatus> {
        if self.lost_frames > 0 {
            self.lost_frames -= 1;
            return Ok(FrameStatus::Skipped);
        }
        self.commands.push(GpuCommand::BeginFrame);
        Ok(FrameStatus::Ready)
    }

    fn dispatch(
        &mut self,
        storage: &StorageView<'_>,
        pass: &PassDescriptor,
        uniforms: &SimUniforms,
        groups: u32,
    ) {
        debug_assert!(self.active_pass.is_none(), "dispatch inside a render pass");
        self.commands.push(GpuCommand::Dispatch {
            buffer: storage.buffer(),
            pass_index: pass.index,
            groups,
            time_step: uniforms.time_step,
        });
    }

    fn memory_barrier(&mut self, barrier: BarrierBits) {
        self.commands.push(GpuCommand::MemoryBarrier(barrier));
    }

    fn write_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.commands.push(GpuCommand::WriteFrameUniforms(*uniforms));
    }

    fn begin_render_pass(&mut self, desc: RenderPassDesc) {
        debug_assert!(self.active_pass.is_none(), "nested render pass");
        self.active_pass = Some(desc.target);
        self.commands.push(GpuCommand::BeginRenderPass(desc));
    }

    fn draw_particles(&mut self, vertices: &VertexView<'_>) {
        let Some(target) = self.active_pass else {
            tracing::error!(target: "render", "draw_particles outside a render pass");
            return;
        };
        self.commands.push(GpuCommand::DrawParticles {
            buffer: vertices.buffer(),
            target,
            points: vertices.count(),
        });
    }

    fn draw_fullscreen(&mut self, vertex_count: u32, blend: CompositeBlend) {
        debug_assert!(self.active_pass.is_some(), "draw_fullscreen outside a render pass");
        self.commands
            .push(GpuCommand::DrawFullscreen { vertex_count, blend });
    }

    fn end_render_pass(&mut self) {
        self.active_pass = None;
        self.commands.push(GpuCommand::EndRenderPass);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.commands.push(GpuCommand::Resize { width, height });
    }

    fn present(&mut self) -> RenderResult<()> {
        self.commands.push(GpuCommand::Present);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
