use super::backend::{GpuBackend, LoadOp, RenderPassDesc, RenderTarget};
use super::camera::FirstPersonCamera;
use super::particles::VertexView;
use super::postprocess::{CompositeBlend, FULLSCREEN_VERTEX_COUNT};

/// 主通道清屏颜色
pub const CLEAR_COLOR: [f32; 4] = [0.6, 0.6, 0.6, 1.0];

/// 深度清除值
pub const CLEAR_DEPTH: f32 = 1.0;

// ============================================================================
// 帧 Uniform
// ============================================================================

/// 每帧写入一次、由深度预通道和主通道共享的 uniform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// 自启动以来的毫秒数
    pub elapsed_ms: f32,
    /// 屏幕空间四边形边长
    pub quad_length: f32,
    /// 视口尺寸（像素）
    pub viewport: [f32; 2],
}

impl FrameUniforms {
    /// 由当前相机状态生成
    pub fn from_camera(camera: &FirstPersonCamera, elapsed_ms: f32, quad_length: f32) -> Self {
        let (width, height) = camera.viewport();
        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            projection: camera.projection_matrix().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            elapsed_ms,
            quad_length,
            viewport: [width as f32, height as f32],
        }
    }

    /// 从投影矩阵反推的宽高比
    pub fn projection_aspect(&self) -> f32 {
        self.projection[1][1] / self.projection[0][0]
    }
}

// ============================================================================
// 渲染图
// ============================================================================

/// 渲染阶段（按执行顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    /// 只写深度的离屏预通道
    DepthPrepass,
    /// 呈现目标上的点云颜色通道
    Main,
    /// 采样预通道深度的全屏描边合成
    Composite,
}

impl RenderStage {
    pub const ORDER: [RenderStage; 3] = [
        RenderStage::DepthPrepass,
        RenderStage::Main,
        RenderStage::Composite,
    ];

    /// 该阶段的渲染通道描述
    pub fn pass_desc(self, clear_color: [f32; 4]) -> RenderPassDesc {
        match self {
            RenderStage::DepthPrepass => RenderPassDesc {
                target: RenderTarget::DepthPrepass,
                color: None,
                depth: Some(LoadOp::Clear(CLEAR_DEPTH)),
            },
            RenderStage::Main => RenderPassDesc {
                target: RenderTarget::Presentation,
                color: Some(LoadOp::Clear(clear_color)),
                depth: Some(LoadOp::Clear(CLEAR_DEPTH)),
            },
            // 保留主通道颜色，不绑定深度
            RenderStage::Composite => RenderPassDesc {
                target: RenderTarget::Presentation,
                color: Some(LoadOp::Load),
                depth: None,
            },
        }
    }
}

/// 渲染图
///
/// 固定三阶段：深度预通道 → 主颜色通道 → 后处理合成。
/// 三个阶段都只读粒子缓冲，调用方需保证模拟阶段的屏障已全部发出。
#[derive(Debug, Clone)]
pub struct RenderGraph {
    clear_color: [f32; 4],
    composite_blend: CompositeBlend,
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new(CompositeBlend::default())
    }
}

impl RenderGraph {
    pub fn new(composite_blend: CompositeBlend) -> Self {
        Self {
            clear_color: CLEAR_COLOR,
            composite_blend,
        }
    }

    pub fn composite_blend(&self) -> CompositeBlend {
        self.composite_blend
    }

    /// 执行一帧渲染
    ///
    /// # 参数
    /// - `backend`: GPU 后端
    /// - `vertices`: 粒子顶点视图
    /// - `uniforms`: 本帧相机与时间数据
    pub fn execute<B: GpuBackend>(
        &self,
        backend: &mut B,
        vertices: VertexView<'_>,
        uniforms: &FrameUniforms,
    ) {
        backend.write_frame_uniforms(uniforms);

        for stage in RenderStage::ORDER {
            backend.begin_render_pass(stage.pass_desc(self.clear_color));
            match stage {
                RenderStage::DepthPrepass | RenderStage::Main => {
                    backend.draw_particles(&vertices);
                }
                RenderStage::Composite => {
                    backend.draw_fullscreen(FULLSCREEN_VERTEX_COUNT, self.composite_blend);
                }
            }
            backend.end_render_pass();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use crate::render::backend::{GpuCommand, RecordingBackend};
    use crate::render::particles::{GpuParticle, ParticleStore};

    #[test]
    fn test_frame_uniforms_layout() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 160);
    }

    #[test]
    fn test_projection_aspect() {
        let camera = FirstPersonCamera::new(&CameraConfig::default(), 1920, 1080);
        let uniforms = FrameUniforms::from_camera(&camera, 0.0, 0.15);
        assert!((uniforms.projection_aspect() - 1920.0 / 1080.0).abs() < 1e-4);
        assert_eq!(uniforms.viewport, [1920.0, 1080.0]);
    }

    #[test]
    fn test_stage_order_and_targets() {
        let mut backend = RecordingBackend::new();
        let store = ParticleStore::new(&mut backend, &[GpuParticle::default(); 10]).unwrap();
        backend.clear();

        let camera = FirstPersonCamera::new(&CameraConfig::default(), 800, 600);
        let uniforms = FrameUniforms::from_camera(&camera, 16.0, 0.15);
        RenderGraph::default().execute(&mut backend, store.vertex_view(), &uniforms);

        let buffer = store.buffer();
        assert_eq!(
            backend.commands(),
            &[
                GpuCommand::WriteFrameUniforms(uniforms),
                GpuCommand::BeginRenderPass(RenderStage::DepthPrepass.pass_desc(CLEAR_COLOR)),
                GpuCommand::DrawParticles {
                    buffer,
                    target: RenderTarget::DepthPrepass,
                    points: 10
                },
                GpuCommand::EndRenderPass,
                GpuCommand::BeginRenderPass(RenderStage::Main.pass_desc(CLEAR_COLOR)),
                GpuCommand::DrawParticles {
                    buffer,
                    target: RenderTarget::Presentation,
                    points: 10
                },
                GpuCommand::EndRenderPass,
                GpuCommand::BeginRenderPass(RenderStage::Composite.pass_desc(CLEAR_COLOR)),
                GpuCommand::DrawFullscreen {
                    vertex_count: 6,
                    blend: CompositeBlend::AlphaOver
                },
                GpuCommand::EndRenderPass,
            ]
        );
    }

    #[test]
    fn test_composite_keeps_main_color() {
        let desc = RenderStage::Composite.pass_desc(CLEAR_COLOR);
        assert_eq!(desc.color, Some(LoadOp::Load));
        assert_eq!(desc.depth, None);
        assert_eq!(
            RenderGraph::default().composite_blend().blend_state(),
            Some(wgpu::BlendState::ALPHA_BLENDING)
        );
    }
}
