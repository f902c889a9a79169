//! WGSL 着色器编译与管线链接
//!
//! 所有编译/链接都包在 wgpu 错误作用域里执行，失败时转换为 `RenderError`，
//! 而不是交给设备的未捕获错误回调。

use crate::core::error::{RenderError, RenderResult};

/// 模拟计算着色器
pub const SIMULATE_WGSL: &str = include_str!("shaders/simulate.wgsl");
/// 粒子顶点/片元着色器（深度预通道与主通道共用）
pub const PARTICLE_WGSL: &str = include_str!("shaders/particle.wgsl");
/// 描边合成着色器
pub const COMPOSITE_WGSL: &str = include_str!("shaders/composite.wgsl");

/// 在验证错误作用域内执行 `f`
fn with_validation<T>(device: &wgpu::Device, f: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// 编译 WGSL 着色器模块
///
/// # 参数
/// - `device`: wgpu 设备
/// - `label`: 着色器名称（用于错误信息）
/// - `source`: WGSL 源码
pub fn compile_shader(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> RenderResult<wgpu::ShaderModule> {
    with_validation(device, || {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    })
    .map_err(|e| RenderError::ShaderCompilation {
        label: label.to_string(),
        reason: e.to_string(),
    })
}

/// 链接渲染管线
pub fn link_render_pipeline(
    device: &wgpu::Device,
    desc: &wgpu::RenderPipelineDescriptor<'_>,
) -> RenderResult<wgpu::RenderPipeline> {
    with_validation(device, || device.create_render_pipeline(desc)).map_err(|e| {
        RenderError::PipelineLink {
            label: desc.label.unwrap_or("unnamed").to_string(),
            reason: e.to_string(),
        }
    })
}

/// 链接计算管线
pub fn link_compute_pipeline(
    device: &wgpu::Device,
    desc: &wgpu::ComputePipelineDescriptor<'_>,
) -> RenderResult<wgpu::ComputePipeline> {
    with_validation(device, || device.create_compute_pipeline(desc)).map_err(|e| {
        RenderError::PipelineLink {
            label: desc.label.unwrap_or("unnamed").to_string(),
            reason: e.to_string(),
        }
    })
}
