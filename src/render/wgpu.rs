//! wgpu 渲染后端
//!
//! 计算 dispatch 与渲染通道都先在 CPU 侧登记，再在屏障或通道结束时编码进本帧的
//! `CommandEncoder`：
//!
//! - `memory_barrier` 把之前登记的 dispatch 编码为一个计算通道并结束它，
//!   wgpu 在通道边界处插入存储写入 → 顶点读取所需的同步
//! - `end_render_pass` 一次性编码整个渲染通道（wgpu 的 `RenderPass` 借用 encoder，
//!   不能跨方法调用保存）
//! - `present` 提交 encoder 并呈现

use std::collections::HashMap;
use std::sync::Arc;

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::backend::{
    BarrierBits, BufferHandle, FrameStatus, GpuBackend, LoadOp, RenderPassDesc, RenderTarget,
};
use super::graph::FrameUniforms;
use super::offscreen::{needs_resize, DepthTarget, DEPTH_FORMAT};
use super::particles::simulation::{PASS_COUNT, UNIFORM_SLOT_STRIDE};
use super::particles::{GpuParticle, PassDescriptor, SimUniforms, StorageView, VertexView};
use super::postprocess::{CompositeBlend, OutlineSettings, OutlineUniforms};
use super::shader::{
    compile_shader, link_compute_pipeline, link_render_pipeline, COMPOSITE_WGSL, PARTICLE_WGSL,
    SIMULATE_WGSL,
};
use crate::config::{CameraConfig, GraphicsConfig};
use crate::core::error::{RenderError, RenderResult};
use crate::resources::ImageData;

/// 粒子缓冲及其计算绑定组
struct ParticleBinding {
    buffer: wgpu::Buffer,
    compute_bind_group: wgpu::BindGroup,
}

struct PendingDispatch {
    buffer: BufferHandle,
    uniform_offset: u32,
    groups: u32,
}

enum PendingDraw {
    Particles { buffer: BufferHandle, count: u32 },
    Fullscreen { vertex_count: u32, blend: CompositeBlend },
}

struct PendingPass {
    desc: RenderPassDesc,
    draws: Vec<PendingDraw>,
}

/// 当前帧状态（begin_frame 到 present 之间）
struct FrameState {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
    pending_dispatches: Vec<PendingDispatch>,
    pending_pass: Option<PendingPass>,
}

/// wgpu 后端
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    adapter_name: String,

    // Simulation
    compute_pipeline: wgpu::ComputePipeline,
    compute_bind_group_layout: wgpu::BindGroupLayout,
    sim_uniform_buffer: wgpu::Buffer,

    // Particles
    frame_uniform_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    sprite_bind_group: wgpu::BindGroup,
    depth_pipeline: wgpu::RenderPipeline,
    color_pipeline: wgpu::RenderPipeline,

    // Composite
    composite_pipeline: wgpu::RenderPipeline,
    composite_bind_group_layout: wgpu::BindGroupLayout,
    composite_bind_group: wgpu::BindGroup,
    outline_buffer: wgpu::Buffer,

    // Targets
    depth_prepass: DepthTarget,
    main_depth: DepthTarget,

    particle_buffers: HashMap<BufferHandle, ParticleBinding>,
    next_buffer_id: u64,
    frame: Option<FrameState>,
}

impl WgpuBackend {
    /// 创建 wgpu 后端
    ///
    /// # 参数
    /// - `window`: 目标窗口
    /// - `graphics`: 图形配置（vsync）
    /// - `camera`: 相机配置（描边合成需要近/远裁剪面）
    /// - `sprite`: 粒子精灵图像
    pub async fn new(
        window: Arc<Window>,
        graphics: &GraphicsConfig,
        camera: &CameraConfig,
        sprite: &ImageData,
    ) -> RenderResult<Self> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(|e| RenderError::SurfaceCreation(e.to_string()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let info = adapter.get_info();
        tracing::info!(target: "render", "Using adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("SPH Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::DeviceRequest(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| RenderError::Surface("Surface reports no formats".to_string()))?;
        let present_mode = if graphics.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::info!(
            target: "render",
            "Surface configured: {}x{} {:?} {:?}",
            width,
            height,
            format,
            present_mode
        );

        // --- Simulation ---
        let simulate_shader = compile_shader(&device, "simulate.wgsl", SIMULATE_WGSL)?;

        let compute_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Simulation Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: false },
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(GpuParticle::STRIDE),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: true,
                            min_binding_size: wgpu::BufferSize::new(
                                std::mem::size_of::<SimUniforms>() as u64,
                            ),
                        },
                        count: None,
                    },
                ],
            });

        let compute_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Simulation Pipeline Layout"),
            bind_group_layouts: &[&compute_bind_group_layout],
            push_constant_ranges: &[],
        });
        let compute_pipeline = link_compute_pipeline(
            &device,
            &wgpu::ComputePipelineDescriptor {
                label: Some("Simulation Pipeline"),
                layout: Some(&compute_layout),
                module: &simulate_shader,
                entry_point: "main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
        )?;

        // 每个 pass 一个 256 字节槽，dispatch 时用动态偏移选择
        let sim_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Simulation Uniforms"),
            size: PASS_COUNT as u64 * UNIFORM_SLOT_STRIDE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // --- Particles ---
        let particle_shader = compile_shader(&device, "particle.wgsl", PARTICLE_WGSL)?;

        let frame_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniforms"),
            contents: bytemuck::bytes_of(&FrameUniforms::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_uniform_buffer.as_entire_binding(),
            }],
        });

        let sprite_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Sprite Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });
        let sprite_bind_group =
            create_sprite_bind_group(&device, &queue, &sprite_bind_group_layout, sprite);

        let particle_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &sprite_bind_group_layout],
            push_constant_ranges: &[],
        });
        let particle_depth_state = wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        };
        let particle_primitive = wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        };

        let depth_pipeline = link_render_pipeline(
            &device,
            &wgpu::RenderPipelineDescriptor {
                label: Some("Particle Depth Pre-pass Pipeline"),
                layout: Some(&particle_layout),
                vertex: wgpu::VertexState {
                    module: &particle_shader,
                    entry_point: "vs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[GpuParticle::vertex_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &particle_shader,
                    entry_point: "fs_depth",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[],
                }),
                primitive: particle_primitive,
                depth_stencil: Some(particle_depth_state.clone()),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            },
        )?;

        let color_pipeline = link_render_pipeline(
            &device,
            &wgpu::RenderPipelineDescriptor {
                label: Some("Particle Color Pipeline"),
                layout: Some(&particle_layout),
                vertex: wgpu::VertexState {
                    module: &particle_shader,
                    entry_point: "vs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[GpuParticle::vertex_layout()],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &particle_shader,
                    entry_point: "fs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: particle_primitive,
                depth_stencil: Some(particle_depth_state),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            },
        )?;

        // --- Targets ---
        let depth_prepass = DepthTarget::new(&device, "Depth Pre-pass Target", width, height, true);
        let main_depth = DepthTarget::new(&device, "Main Depth Target", width, height, false);

        // --- Composite ---
        let composite_shader = compile_shader(&device, "composite.wgsl", COMPOSITE_WGSL)?;
        let outline: OutlineUniforms = OutlineSettings::default().uniforms(camera.near, camera.far);
        let outline_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Outline Uniforms"),
            contents: bytemuck::bytes_of(&outline),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let composite_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Composite Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Depth,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });
        let composite_bind_group = create_composite_bind_group(
            &device,
            &composite_bind_group_layout,
            &depth_prepass,
            &outline_buffer,
        );
        let composite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&composite_bind_group_layout],
            push_constant_ranges: &[],
        });

        let composite_pipeline = link_render_pipeline(
            &device,
            &wgpu::RenderPipelineDescriptor {
                label: Some("Composite Pipeline"),
                layout: Some(&composite_layout),
                vertex: wgpu::VertexState {
                    module: &composite_shader,
                    entry_point: "vs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &composite_shader,
                    entry_point: "fs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: CompositeBlend::AlphaOver.blend_state(),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            },
        )?;

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_name: info.name,
            compute_pipeline,
            compute_bind_group_layout,
            sim_uniform_buffer,
            frame_uniform_buffer,
            frame_bind_group,
            sprite_bind_group,
            depth_pipeline,
            color_pipeline,
            composite_pipeline,
            composite_bind_group_layout,
            composite_bind_group,
            outline_buffer,
            depth_prepass,
            main_depth,
            particle_buffers: HashMap::new(),
            next_buffer_id: 1,
            frame: None,
        })
    }

    /// 适配器名称
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    /// 把登记的 dispatch 编码为一个计算通道
    fn flush_compute(&mut self) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        if frame.pending_dispatches.is_empty() {
            return;
        }

        let mut cpass = frame
            .encoder
            .begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Particle Simulation Pass"),
                timestamp_writes: None,
            });
        cpass.set_pipeline(&self.compute_pipeline);
        for dispatch in frame.pending_dispatches.drain(..) {
            let Some(binding) = self.particle_buffers.get(&dispatch.buffer) else {
                tracing::warn!(target: "render", "Dispatch on unknown buffer {:?}", dispatch.buffer);
                continue;
            };
            cpass.set_bind_group(0, &binding.compute_bind_group, &[dispatch.uniform_offset]);
            cpass.dispatch_workgroups(dispatch.groups, 1, 1);
        }
    }

    /// 编码一个完整的渲染通道
    fn encode_render_pass(&mut self, pass: PendingPass) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> =
            match (pass.desc.target, pass.desc.color) {
                (RenderTarget::Presentation, Some(load)) => {
                    vec![Some(wgpu::RenderPassColorAttachment {
                        view: &frame.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: match load {
                                LoadOp::Clear(c) => wgpu::LoadOp::Clear(wgpu::Color {
                                    r: c[0] as f64,
                                    g: c[1] as f64,
                                    b: c[2] as f64,
                                    a: c[3] as f64,
                                }),
                                LoadOp::Load => wgpu::LoadOp::Load,
                            },
                            store: wgpu::StoreOp::Store,
                        },
                    })]
                }
                _ => Vec::new(),
            };

        let depth_view = match pass.desc.target {
            RenderTarget::DepthPrepass => &self.depth_prepass.view,
            RenderTarget::Presentation => &self.main_depth.view,
        };
        let depth_stencil_attachment =
            pass.desc
                .depth
                .map(|load| wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: match load {
                            LoadOp::Clear(d) => wgpu::LoadOp::Clear(d),
                            LoadOp::Load => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                });

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(match pass.desc.target {
                RenderTarget::DepthPrepass => "Depth Pre-pass",
                RenderTarget::Presentation => "Presentation Pass",
            }),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for draw in &pass.draws {
            match *draw {
                PendingDraw::Particles { buffer, count } => {
                    let Some(binding) = self.particle_buffers.get(&buffer) else {
                        tracing::warn!(target: "render", "Draw from unknown buffer {:?}", buffer);
                        continue;
                    };
                    let pipeline = match pass.desc.target {
                        RenderTarget::DepthPrepass => &self.depth_pipeline,
                        RenderTarget::Presentation => &self.color_pipeline,
                    };
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, &self.frame_bind_group, &[]);
                    rpass.set_bind_group(1, &self.sprite_bind_group, &[]);
                    rpass.set_vertex_buffer(0, binding.buffer.slice(..));
                    // 每个粒子一个实例，6 个顶点展开为四边形
                    rpass.draw(0..6, 0..count);
                }
                PendingDraw::Fullscreen { vertex_count, blend } => {
                    let pipeline = match blend {
                        CompositeBlend::AlphaOver => &self.composite_pipeline,
                    };
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, &self.composite_bind_group, &[]);
                    rpass.draw(0..vertex_count, 0..1);
                }
            }
        }
    }
}

impl GpuBackend for WgpuBackend {
    fn create_particle_buffer(&mut self, particles: &[GpuParticle]) -> RenderResult<BufferHandle> {
        let size = std::mem::size_of_val(particles) as u64;
        let limit = self.device.limits().max_storage_buffer_binding_size as u64;
        if size > limit {
            return Err(RenderError::InvalidState(format!(
                "Particle buffer of {} bytes exceeds storage binding limit {}",
                size, limit
            )));
        }

        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Buffer"),
            contents: bytemuck::cast_slice(particles),
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::COPY_DST,
        });
        let compute_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Simulation Bind Group"),
            layout: &self.compute_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.sim_uniform_buffer,
                        offset: 0,
                        size: wgpu::BufferSize::new(std::mem::size_of::<SimUniforms>() as u64),
                    }),
                },
            ],
        });

        let handle = BufferHandle(self.next_buffer_id);
        self.next_buffer_id += 1;
        self.particle_buffers.insert(
            handle,
            ParticleBinding {
                buffer,
                compute_bind_group,
            },
        );
        Ok(handle)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(binding) = self.particle_buffers.remove(&buffer) {
            binding.buffer.destroy();
        }
    }

    fn begin_frame(&mut self) -> RenderResult<FrameStatus> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                tracing::warn!(target: "render", "Surface {}; reconfiguring and skipping frame", e);
                self.surface.configure(&self.device, &self.config);
                return Ok(FrameStatus::Skipped);
            }
            Err(e @ wgpu::SurfaceError::OutOfMemory) => {
                return Err(RenderError::Surface(e.to_string()));
            }
            Err(e) => {
                tracing::warn!(target: "render", "Frame acquisition failed: {}; skipping frame", e);
                return Ok(FrameStatus::Skipped);
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.frame = Some(FrameState {
            surface_texture,
            view,
            encoder,
            pending_dispatches: Vec::new(),
            pending_pass: None,
        });
        Ok(FrameStatus::Ready)
    }

    fn dispatch(
        &mut self,
        storage: &StorageView<'_>,
        pass: &PassDescriptor,
        uniforms: &SimUniforms,
        groups: u32,
    ) {
        let Some(frame) = self.frame.as_mut() else {
            tracing::warn!(target: "render", "dispatch outside a frame");
            return;
        };
        self.queue.write_buffer(
            &self.sim_uniform_buffer,
            pass.uniform_offset as u64,
            bytemuck::bytes_of(uniforms),
        );
        frame.pending_dispatches.push(PendingDispatch {
            buffer: storage.buffer(),
            uniform_offset: pass.uniform_offset,
            groups,
        });
    }

    fn memory_barrier(&mut self, barrier: BarrierBits) {
        tracing::trace!(target: "render", "memory barrier {:?}", barrier);
        self.flush_compute();
    }

    fn write_frame_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.queue
            .write_buffer(&self.frame_uniform_buffer, 0, bytemuck::bytes_of(uniforms));
    }

    fn begin_render_pass(&mut self, desc: RenderPassDesc) {
        self.flush_compute();
        if let Some(frame) = self.frame.as_mut() {
            frame.pending_pass = Some(PendingPass {
                desc,
                draws: Vec::new(),
            });
        }
    }

    fn draw_particles(&mut self, vertices: &VertexView<'_>) {
        if let Some(pass) = self.frame.as_mut().and_then(|f| f.pending_pass.as_mut()) {
            pass.draws.push(PendingDraw::Particles {
                buffer: vertices.buffer(),
                count: vertices.count(),
            });
        }
    }

    fn draw_fullscreen(&mut self, vertex_count: u32, blend: CompositeBlend) {
        if let Some(pass) = self.frame.as_mut().and_then(|f| f.pending_pass.as_mut()) {
            pass.draws
                .push(PendingDraw::Fullscreen { vertex_count, blend });
        }
    }

    fn end_render_pass(&mut self) {
        if let Some(pass) = self.frame.as_mut().and_then(|f| f.pending_pass.take()) {
            self.encode_render_pass(pass);
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if !needs_resize((self.config.width, self.config.height), (width, height)) {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.main_depth.resize(&self.device, width, height);
        if self.depth_prepass.resize(&self.device, width, height) {
            self.composite_bind_group = create_composite_bind_group(
                &self.device,
                &self.composite_bind_group_layout,
                &self.depth_prepass,
                &self.outline_buffer,
            );
        }
        tracing::debug!(target: "render", "Resized surface and depth targets to {}x{}", width, height);
    }

    fn present(&mut self) -> RenderResult<()> {
        self.flush_compute();
        let Some(frame) = self.frame.take() else {
            return Ok(());
        };
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
        Ok(())
    }

    fn name(&self) -> &str {
        "wgpu"
    }
}

fn create_sprite_bind_group(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sprite: &ImageData,
) -> wgpu::BindGroup {
    let extent = wgpu::Extent3d {
        width: sprite.width,
        height: sprite.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Particle Sprite"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &sprite.pixels,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(sprite.bytes_per_row()),
            rows_per_image: Some(sprite.height),
        },
        extent,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Particle Sprite Sampler"),
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Sprite Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    })
}

fn create_composite_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    depth_prepass: &DepthTarget,
    outline_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Composite Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&depth_prepass.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: outline_buffer.as_entire_binding(),
            },
        ],
    })
}
