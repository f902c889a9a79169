use std::marker::PhantomData;

use glam::Vec3;
use rand::Rng;

use super::GpuParticle;
use crate::config::ParticleConfig;
use crate::core::error::{RenderError, RenderResult};
use crate::render::backend::{BufferHandle, GpuBackend};

/// 固定容量的粒子缓冲
///
/// 构建时分配一次，之后容量 N 不再改变，粒子身份即缓冲索引。
/// 通过两个不持有所有权的视图访问同一块内存：
///
/// - [`StorageView`]：随机读写，只由模拟阶段使用，写入发生在三次 dispatch 中
/// - [`VertexView`]：固定步长顺序读取，只由渲染图使用，读取发生在全部屏障之后
pub struct ParticleStore {
    buffer: BufferHandle,
    capacity: u32,
}

impl ParticleStore {
    /// 用给定的初始记录分配缓冲
    ///
    /// # 参数
    /// - `backend`: GPU 后端
    /// - `initial`: 初始粒子记录，长度即容量
    pub fn new<B: GpuBackend>(backend: &mut B, initial: &[GpuParticle]) -> RenderResult<Self> {
        if initial.is_empty() {
            return Err(RenderError::InvalidState(
                "Particle store requires at least one record".to_string(),
            ));
        }
        let capacity = u32::try_from(initial.len()).map_err(|_| {
            RenderError::InvalidState(format!("Too many particles: {}", initial.len()))
        })?;

        let buffer = backend.create_particle_buffer(initial)?;
        tracing::info!(
            target: "simulation",
            "Allocated particle buffer: {} records, {} bytes",
            capacity,
            capacity as u64 * GpuParticle::STRIDE
        );

        Ok(Self { buffer, capacity })
    }

    /// 按配置在球体内随机播种粒子并分配缓冲
    pub fn seeded<B: GpuBackend, R: Rng>(
        backend: &mut B,
        config: &ParticleConfig,
        rng: &mut R,
    ) -> RenderResult<Self> {
        let particles = seed_particles(config, rng);
        Self::new(backend, &particles)
    }

    /// 粒子数量 N
    pub fn len(&self) -> u32 {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.capacity == 0
    }

    /// 底层缓冲句柄
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// 模拟阶段使用的存储视图
    pub fn storage_view(&self) -> StorageView<'_> {
        StorageView {
            buffer: self.buffer,
            count: self.capacity,
            _store: PhantomData,
        }
    }

    /// 渲染阶段使用的顶点视图
    pub fn vertex_view(&self) -> VertexView<'_> {
        VertexView {
            buffer: self.buffer,
            count: self.capacity,
            _store: PhantomData,
        }
    }

    /// 释放缓冲
    pub fn release<B: GpuBackend>(self, backend: &mut B) {
        backend.destroy_buffer(self.buffer);
        tracing::debug!(target: "simulation", "Released particle buffer {:?}", self.buffer);
    }
}

/// 随机读写存储视图（按索引）
#[derive(Debug, Clone, Copy)]
pub struct StorageView<'a> {
    buffer: BufferHandle,
    count: u32,
    _store: PhantomData<&'a ParticleStore>,
}

impl StorageView<'_> {
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn stride(&self) -> u64 {
        GpuParticle::STRIDE
    }
}

/// 顺序顶点视图（固定步长）
#[derive(Debug, Clone, Copy)]
pub struct VertexView<'a> {
    buffer: BufferHandle,
    count: u32,
    _store: PhantomData<&'a ParticleStore>,
}

impl VertexView<'_> {
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn stride(&self) -> u64 {
        GpuParticle::STRIDE
    }

    pub fn layout(&self) -> wgpu::VertexBufferLayout<'static> {
        GpuParticle::vertex_layout()
    }
}

/// 在半径为 `init_radius` 的球体内均匀播种 N 个粒子
///
/// 速度为零，质量为 1，颜色按高度从深蓝渐变到青色，渲染标量取粒子尺寸。
pub fn seed_particles<R: Rng>(config: &ParticleConfig, rng: &mut R) -> Vec<GpuParticle> {
    let radius = config.init_radius;
    let deep = Vec3::new(0.05, 0.2, 0.65);
    let shallow = Vec3::new(0.3, 0.85, 0.95);

    (0..config.count)
        .map(|_| {
            let p = loop {
                let candidate = Vec3::new(
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                    rng.gen_range(-1.0..=1.0),
                );
                if candidate.length_squared() <= 1.0 {
                    break candidate * radius;
                }
            };
            let t = (p.y / radius * 0.5 + 0.5).clamp(0.0, 1.0);
            let color = deep.lerp(shallow, t);

            GpuParticle {
                position: [p.x, p.y, p.z, 1.0],
                mass: 1.0,
                render_scalar: config.size,
                color: [color.x, color.y, color.z, 1.0],
                ..Default::default()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{GpuCommand, RecordingBackend};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(count: u32) -> ParticleConfig {
        ParticleConfig {
            count,
            ..Default::default()
        }
    }

    #[test]
    fn test_views_alias_one_buffer() {
        let mut backend = RecordingBackend::new();
        let mut rng = StdRng::seed_from_u64(7);
        let store = ParticleStore::seeded(&mut backend, &config(64), &mut rng).unwrap();

        let storage = store.storage_view();
        let vertex = store.vertex_view();
        assert_eq!(storage.buffer(), vertex.buffer());
        assert_eq!(storage.count(), 64);
        assert_eq!(vertex.count(), 64);
        assert_eq!(storage.stride(), vertex.stride());
        assert_eq!(vertex.layout().array_stride, storage.stride());
    }

    #[test]
    fn test_empty_store_rejected() {
        let mut backend = RecordingBackend::new();
        assert!(ParticleStore::new(&mut backend, &[]).is_err());
    }

    #[test]
    fn test_release_destroys_buffer() {
        let mut backend = RecordingBackend::new();
        let store = ParticleStore::new(&mut backend, &[GpuParticle::default(); 4]).unwrap();
        let handle = store.buffer();
        store.release(&mut backend);
        assert!(backend
            .commands()
            .contains(&GpuCommand::DestroyBuffer { buffer: handle }));
    }

    proptest! {
        #[test]
        fn prop_seeded_store_holds_exactly_n(count in 1u32..2048, seed in any::<u64>()) {
            let mut backend = RecordingBackend::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let store = ParticleStore::seeded(&mut backend, &config(count), &mut rng).unwrap();
            prop_assert_eq!(store.len(), count);
            prop_assert_eq!(backend.buffer_len(store.buffer()), Some(count));
        }

        #[test]
        fn prop_seeds_inside_sphere(seed in any::<u64>()) {
            let cfg = config(256);
            let mut rng = StdRng::seed_from_u64(seed);
            for p in seed_particles(&cfg, &mut rng) {
                let pos = Vec3::new(p.position[0], p.position[1], p.position[2]);
                prop_assert!(pos.length() <= cfg.init_radius + 1e-4);
                prop_assert_eq!(p.position[3], 1.0);
                prop_assert_eq!(p.render_scalar, cfg.size);
            }
        }
    }
}
