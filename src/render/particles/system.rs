use glam::Vec3;

use super::attractor::Attractor;
use super::simulation::SimulationStage;
use super::store::ParticleStore;
use super::GpuParticle;
use crate::config::EngineConfig;
use crate::core::error::{RenderError, RenderResult};
use crate::platform::InputState;
use crate::render::backend::{FrameStatus, GpuBackend};
use crate::render::camera::FirstPersonCamera;
use crate::render::graph::{FrameUniforms, RenderGraph};

/// 粒子系统
///
/// 顶层管线对象：独占粒子缓冲，按帧驱动模拟阶段与渲染图，并在 `shutdown` 时释放 GPU 资源。
pub struct ParticleSystem<B: GpuBackend> {
    backend: B,
    store: Option<ParticleStore>,
    simulation: SimulationStage,
    graph: RenderGraph,
    camera: FirstPersonCamera,
    attractor: Attractor,
    quad_length: f32,
    frames_rendered: u64,
}

impl<B: GpuBackend> ParticleSystem<B> {
    /// 按配置创建，粒子在初始半径的球体内随机播种
    pub fn new(mut backend: B, config: &EngineConfig) -> RenderResult<Self> {
        let store =
            ParticleStore::seeded(&mut backend, &config.particles, &mut rand::thread_rng())?;
        Ok(Self::from_store(backend, store, config))
    }

    /// 用给定的粒子记录创建（记录数即 N）
    pub fn with_particles(
        mut backend: B,
        config: &EngineConfig,
        particles: &[GpuParticle],
    ) -> RenderResult<Self> {
        let store = ParticleStore::new(&mut backend, particles)?;
        Ok(Self::from_store(backend, store, config))
    }

    fn from_store(backend: B, store: ParticleStore, config: &EngineConfig) -> Self {
        let camera = FirstPersonCamera::new(
            &config.camera,
            config.graphics.width,
            config.graphics.height,
        );
        tracing::info!(
            target: "engine",
            "Particle system ready on '{}' backend: {} particles",
            backend.name(),
            store.len()
        );

        Self {
            simulation: SimulationStage::new(store.len()),
            graph: RenderGraph::default(),
            attractor: Attractor::new(
                config.simulation.attractor_distance,
                config.simulation.attractor_strength,
            ),
            quad_length: config.particles.size,
            frames_rendered: 0,
            store: Some(store),
            camera,
            backend,
        }
    }

    /// 窗口尺寸变化：立即更新投影，并同步调整深度预通道目标
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            tracing::debug!(target: "render", "Ignoring zero-sized resize");
            return;
        }
        self.camera.resize(width, height);
        self.backend.resize(width, height);
        tracing::debug!(target: "render", "Resized to {}x{}", width, height);
    }

    /// 更新相机
    pub fn update_camera(&mut self, dt: f32, input: &InputState, mouse_delta: (f32, f32)) {
        self.camera.update_camera(dt, input, mouse_delta);
    }

    /// 更新吸引点（位于相机正前方）
    pub fn update_attractor(&mut self, active: bool) {
        self.attractor
            .update(active, self.camera.position, self.camera.forward());
    }

    /// 渲染一帧
    ///
    /// # 参数
    /// - `dt`: 距上一渲染帧的墙钟间隔（秒）
    /// - `elapsed_ms`: 自启动以来的毫秒数
    /// - `time_step`: 模拟时间步
    ///
    /// # 返回
    /// 呈现表面暂不可用时返回 `FrameStatus::Skipped`，本帧既不模拟也不绘制
    pub fn render(&mut self, dt: f32, elapsed_ms: f32, time_step: f32) -> RenderResult<FrameStatus> {
        let _span = tracing::trace_span!("frame", dt, time_step).entered();

        let Some(store) = self.store.as_ref() else {
            return Err(RenderError::InvalidState(
                "Particle system has been shut down".to_string(),
            ));
        };

        if self.backend.begin_frame()? == FrameStatus::Skipped {
            return Ok(FrameStatus::Skipped);
        }

        self.simulation.run(
            &mut self.backend,
            store.storage_view(),
            time_step.max(0.0),
            &self.attractor,
        );

        let uniforms = FrameUniforms::from_camera(&self.camera, elapsed_ms, self.quad_length);
        self.graph
            .execute(&mut self.backend, store.vertex_view(), &uniforms);

        self.frames_rendered += 1;
        Ok(FrameStatus::Ready)
    }

    /// 提交并呈现
    pub fn present(&mut self) -> RenderResult<()> {
        self.backend.present()
    }

    pub fn camera(&self) -> &FirstPersonCamera {
        &self.camera
    }

    pub fn attractor(&self) -> &Attractor {
        &self.attractor
    }

    /// 吸引点当前位置
    pub fn attractor_position(&self) -> Vec3 {
        self.attractor.position()
    }

    /// 粒子数量 N（关闭后为 0）
    pub fn particle_count(&self) -> u32 {
        self.store.as_ref().map_or(0, ParticleStore::len)
    }

    /// 已渲染帧数
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// 释放粒子缓冲并交还后端
    pub fn shutdown(mut self) -> B {
        if let Some(store) = self.store.take() {
            store.release(&mut self.backend);
        }
        tracing::info!(
            target: "engine",
            "Particle system shut down after {} frames",
            self.frames_rendered
        );
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{GpuCommand, RecordingBackend};

    fn config(count: u32) -> EngineConfig {
        let mut config = EngineConfig::default();
        config.particles.count = count;
        config
    }

    #[test]
    fn test_skipped_frame_issues_no_work() {
        let mut backend = RecordingBackend::new();
        backend.lose_surface(1);
        let mut system = ParticleSystem::new(backend, &config(32)).unwrap();
        system.backend_mut().clear();

        assert_eq!(system.render(0.016, 0.0, 0.01).unwrap(), FrameStatus::Skipped);
        assert!(system.backend().commands().is_empty());
        assert_eq!(system.frames_rendered(), 0);

        assert_eq!(system.render(0.016, 16.0, 0.01).unwrap(), FrameStatus::Ready);
        assert_eq!(system.frames_rendered(), 1);
    }

    #[test]
    fn test_negative_step_is_clamped() {
        let mut system = ParticleSystem::new(RecordingBackend::new(), &config(8)).unwrap();
        system.render(0.016, 0.0, -1.0).unwrap();
        for command in system.backend().commands() {
            if let GpuCommand::Dispatch { time_step, .. } = command {
                assert!(*time_step >= 0.0);
            }
        }
    }

    #[test]
    fn test_zero_resize_ignored() {
        let mut system = ParticleSystem::new(RecordingBackend::new(), &config(8)).unwrap();
        let aspect = system.camera().aspect();
        system.backend_mut().clear();
        system.resize(0, 0);
        assert_eq!(system.camera().aspect(), aspect);
        assert!(system.backend().commands().is_empty());
    }

    #[test]
    fn test_shutdown_releases_buffer() {
        let system = ParticleSystem::new(RecordingBackend::new(), &config(8)).unwrap();
        let backend = system.shutdown();
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn test_attractor_follows_camera() {
        let mut system = ParticleSystem::new(RecordingBackend::new(), &config(8)).unwrap();
        system.update_attractor(true);
        let camera = system.camera();
        let expected = camera.position + camera.forward() * 10.0;
        assert!((system.attractor_position() - expected).length() < 1e-4);
        assert!(system.attractor().is_active());
    }
}
