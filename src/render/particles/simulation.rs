use super::attractor::Attractor;
use super::store::StorageView;
use crate::render::backend::{BarrierBits, GpuBackend};

/// 计算着色器工作组大小
pub const WORKGROUP_SIZE: u32 = 256;

/// 每帧计算 pass 数
pub const PASS_COUNT: usize = 3;

/// 动态偏移 uniform 槽的步长（满足 `min_uniform_buffer_offset_alignment`）
pub const UNIFORM_SLOT_STRIDE: u32 = 256;

/// 单个计算 pass 的 uniform
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimUniforms {
    /// 当前时间步
    pub time_step: f32,
    /// pass 编号（1..=3）
    pub pass_index: u32,
    /// 粒子数量，核函数据此做越界检查
    pub particle_count: u32,
    /// 吸引点强度（未激活时为 0）
    pub attractor_strength: f32,
    /// 吸引点位置
    pub attractor_position: [f32; 4],
}

/// 计算 pass 描述符
///
/// 在管线构建时一次性确定：pass 编号、uniform 所在的动态偏移，以及 pass 之后必须插入的屏障。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassDescriptor {
    pub index: u32,
    pub uniform_offset: u32,
    pub barrier: BarrierBits,
}

/// 模拟阶段
///
/// 每帧严格按 1、2、3 的顺序发出三次 dispatch，每次之后插入覆盖
/// 存储写入与顶点属性读取的完整屏障。
#[derive(Debug, Clone)]
pub struct SimulationStage {
    passes: [PassDescriptor; PASS_COUNT],
    particle_count: u32,
    group_count: u32,
}

impl SimulationStage {
    /// 为 N 个粒子构建三个 pass 描述符
    pub fn new(particle_count: u32) -> Self {
        let passes = std::array::from_fn(|slot| PassDescriptor {
            index: slot as u32 + 1,
            uniform_offset: slot as u32 * UNIFORM_SLOT_STRIDE,
            barrier: BarrierBits::SHADER_STORAGE | BarrierBits::VERTEX_ATTRIB_ARRAY,
        });
        let group_count = Self::group_count(particle_count);

        tracing::info!(
            target: "simulation",
            "Simulation plan: {} particles, workgroup {}, {} groups x {} passes",
            particle_count,
            WORKGROUP_SIZE,
            group_count,
            PASS_COUNT
        );

        Self {
            passes,
            particle_count,
            group_count,
        }
    }

    /// 工作组数量：`ceil(N / WORKGROUP_SIZE) + 1`
    ///
    /// 多出的一个工作组依赖核函数对 `particle_count` 的越界检查。
    pub fn group_count(particle_count: u32) -> u32 {
        particle_count.div_ceil(WORKGROUP_SIZE) + 1
    }

    pub fn passes(&self) -> &[PassDescriptor; PASS_COUNT] {
        &self.passes
    }

    pub fn particle_count(&self) -> u32 {
        self.particle_count
    }

    /// 执行一帧模拟
    ///
    /// # 参数
    /// - `backend`: GPU 后端
    /// - `storage`: 粒子存储视图
    /// - `time_step`: 当前时间步（冻结时为 0，同样会发出三次 dispatch）
    /// - `attractor`: 吸引点
    pub fn run<B: GpuBackend>(
        &self,
        backend: &mut B,
        storage: StorageView<'_>,
        time_step: f32,
        attractor: &Attractor,
    ) {
        debug_assert_eq!(storage.count(), self.particle_count);
        let (attractor_position, attractor_strength) = attractor.uniform();

        for pass in &self.passes {
            let uniforms = SimUniforms {
                time_step,
                pass_index: pass.index,
                particle_count: self.particle_count,
                attractor_strength,
                attractor_position,
            };
            backend.dispatch(&storage, pass, &uniforms, self.group_count);
            backend.memory_barrier(pass.barrier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{GpuCommand, RecordingBackend};
    use crate::render::particles::{GpuParticle, ParticleStore};
    use proptest::prelude::*;

    #[test]
    fn test_group_count_over_provisions_by_one() {
        assert_eq!(SimulationStage::group_count(1), 2);
        assert_eq!(SimulationStage::group_count(256), 2);
        assert_eq!(SimulationStage::group_count(257), 3);
        assert_eq!(SimulationStage::group_count(1000), 5);
    }

    #[test]
    fn test_pass_descriptors() {
        let stage = SimulationStage::new(1000);
        let passes = stage.passes();
        assert_eq!(
            passes.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(passes[2].uniform_offset, 2 * UNIFORM_SLOT_STRIDE);
        assert!(passes
            .iter()
            .all(|p| p.barrier == BarrierBits::SHADER_STORAGE | BarrierBits::VERTEX_ATTRIB_ARRAY));
    }

    #[test]
    fn test_sim_uniforms_size() {
        assert_eq!(std::mem::size_of::<SimUniforms>(), 32);
    }

    proptest! {
        #[test]
        fn prop_three_barrier_separated_dispatches(
            count in 1u32..5000,
            time_step in 0.0f32..1.0,
        ) {
            let mut backend = RecordingBackend::new();
            let store = ParticleStore::new(
                &mut backend,
                &vec![GpuParticle::default(); count as usize],
            ).unwrap();
            backend.clear();

            let stage = SimulationStage::new(count);
            stage.run(&mut backend, store.storage_view(), time_step, &Attractor::default());

            let expected_groups = count.div_ceil(WORKGROUP_SIZE) + 1;
            let commands = backend.commands();
            prop_assert_eq!(commands.len(), 6);
            for (i, pair) in commands.chunks(2).enumerate() {
                match pair[0] {
                    GpuCommand::Dispatch { pass_index, groups, .. } => {
                        prop_assert_eq!(pass_index, i as u32 + 1);
                        prop_assert_eq!(groups, expected_groups);
                    }
                    ref other => prop_assert!(false, "expected dispatch, got {:?}", other),
                }
                let is_full_barrier = matches!(
                    pair[1],
                    GpuCommand::MemoryBarrier(bits)
                        if bits.contains(BarrierBits::SHADER_STORAGE)
                            && bits.contains(BarrierBits::VERTEX_ATTRIB_ARRAY)
                );
                prop_assert!(is_full_barrier);
            }
        }
    }
}
