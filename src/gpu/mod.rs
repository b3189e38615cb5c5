//! wgpu backend.
//!
//! Each frame records, into one command encoder:
//!
//! 1. a render pass into the collision mask texture (paint or erase, skipped
//!    when the brush is idle);
//! 2. a compute pass that reads the boid buffer and the mask and writes a
//!    scratch buffer, followed by a copy of the scratch buffer back;
//! 3. a render pass into the surface that composites the mask and draws the
//!    boids as instanced darts;
//! 4. optionally the egui overlay.
//!
//! Bind groups that reference the boid buffer or the mask texture are rebuilt
//! whenever either is rebound, so no pass ever holds a released resource.

#[cfg(feature = "egui")]
pub(crate) mod egui_integration;

use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::backend::Backend;
use crate::boid::{BoidAllocator, BoidRecord};
use crate::error::{FrameError, GpuError};
use crate::mask::MaskAllocator;
use crate::params::WORKGROUP_WIDTH;
use crate::shader::{self, compute_slots, paint_slots, render_slots};
use crate::uniforms::{BoidUniforms, PaintUniforms, RenderUniforms};

/// Format of the collision mask texture.
pub const MASK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.05,
    a: 1.0,
};

/// A boid array on the GPU: the live buffer and its same-sized scratch twin.
pub struct GpuBoids {
    id: u64,
    len: u32,
    buffer: Arc<wgpu::Buffer>,
    scratch: Arc<wgpu::Buffer>,
}

impl GpuBoids {
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A collision mask texture.
pub struct GpuMask {
    id: u64,
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: Arc<wgpu::TextureView>,
}

impl GpuMask {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

struct BoundBoids {
    id: u64,
    buffer: Arc<wgpu::Buffer>,
    scratch: Arc<wgpu::Buffer>,
}

struct BoundMask {
    id: u64,
    view: Arc<wgpu::TextureView>,
}

struct Frame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

struct Layouts {
    compute: wgpu::BindGroupLayout,
    paint: wgpu::BindGroupLayout,
    composite: wgpu::BindGroupLayout,
    view: wgpu::BindGroupLayout,
}

struct Pipelines {
    compute: wgpu::ComputePipeline,
    paint: wgpu::RenderPipeline,
    erase: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
    boids: wgpu::RenderPipeline,
}

/// GPU state for the flocking pipeline.
pub struct GpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// Latest window size; may be zero while minimized.
    size: (u32, u32),
    layouts: Layouts,
    pipelines: Pipelines,
    params_buffer: wgpu::Buffer,
    brush_buffer: wgpu::Buffer,
    view_buffer: wgpu::Buffer,
    paint_bind_group: wgpu::BindGroup,
    view_bind_group: wgpu::BindGroup,
    compute_bind_group: Option<wgpu::BindGroup>,
    composite_bind_group: Option<wgpu::BindGroup>,
    bound_boids: Option<BoundBoids>,
    bound_mask: Option<BoundMask>,
    frame: Option<Frame>,
    boid_size: f32,
    next_id: u64,
    #[cfg(feature = "egui")]
    egui: egui_integration::EguiIntegration,
    #[cfg(feature = "egui")]
    egui_output: Option<egui_integration::EguiFrameOutput>,
}

/// Run `create` inside a validation error scope and turn any error into
/// [`GpuError::Shader`].
async fn checked<T>(
    device: &wgpu::Device,
    label: &'static str,
    create: impl FnOnce() -> T,
) -> Result<T, GpuError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match device.pop_error_scope().await {
        Some(err) => {
            log::error!("{} failed validation: {}", label, err);
            Err(GpuError::Shader {
                label,
                message: err.to_string(),
            })
        }
        None => Ok(value),
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn mask_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let compute = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Boid Compute Bind Group Layout"),
            entries: &[
                storage_entry(compute_slots::BOIDS_IN, true),
                uniform_entry(compute_slots::PARAMS, wgpu::ShaderStages::COMPUTE),
                mask_entry(compute_slots::COLLISION_MASK, wgpu::ShaderStages::COMPUTE),
                storage_entry(compute_slots::BOIDS_OUT, false),
            ],
        });

        // The paint pass renders into the mask, so it must not also bind it.
        let paint = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Paint Bind Group Layout"),
            entries: &[uniform_entry(paint_slots::BRUSH, wgpu::ShaderStages::FRAGMENT)],
        });

        let composite = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                uniform_entry(paint_slots::BRUSH, wgpu::ShaderStages::FRAGMENT),
                mask_entry(paint_slots::COLLISION_MASK, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let view = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Boid View Bind Group Layout"),
            entries: &[uniform_entry(render_slots::VIEW, wgpu::ShaderStages::VERTEX)],
        });

        Self {
            compute,
            paint,
            composite,
            view,
        }
    }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::BindGroupLayout,
    module: &wgpu::ShaderModule,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(shader::FULLSCREEN_VERTEX_ENTRY),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Blend state that adds (paint) or subtracts (erase) the dab from the mask.
fn dab_blend(operation: wgpu::BlendOperation) -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

impl Pipelines {
    async fn new(
        device: &wgpu::Device,
        layouts: &Layouts,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, GpuError> {
        let boids_module = checked(device, "Boid Compute Shader", || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Boid Compute Shader"),
                source: wgpu::ShaderSource::Wgsl(shader::BOIDS_SOURCE.into()),
            })
        })
        .await?;
        let paint_module = checked(device, "Paint Shader", || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Paint Shader"),
                source: wgpu::ShaderSource::Wgsl(shader::PAINT_SOURCE.into()),
            })
        })
        .await?;
        let render_module = checked(device, "Boid Render Shader", || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Boid Render Shader"),
                source: wgpu::ShaderSource::Wgsl(shader::RENDER_SOURCE.into()),
            })
        })
        .await?;

        let compute = checked(device, "Boid Compute Pipeline", || {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Boid Compute Pipeline Layout"),
                bind_group_layouts: &[&layouts.compute],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("Boid Compute Pipeline"),
                layout: Some(&layout),
                module: &boids_module,
                entry_point: Some(shader::COMPUTE_ENTRY),
                compilation_options: Default::default(),
                cache: None,
            })
        })
        .await?;

        let paint = checked(device, "Paint Pipeline", || {
            fullscreen_pipeline(
                device,
                "Paint Pipeline",
                &layouts.paint,
                &paint_module,
                shader::PAINT_FRAGMENT_ENTRY,
                MASK_FORMAT,
                Some(dab_blend(wgpu::BlendOperation::Add)),
            )
        })
        .await?;

        let erase = checked(device, "Erase Pipeline", || {
            fullscreen_pipeline(
                device,
                "Erase Pipeline",
                &layouts.paint,
                &paint_module,
                shader::PAINT_FRAGMENT_ENTRY,
                MASK_FORMAT,
                Some(dab_blend(wgpu::BlendOperation::ReverseSubtract)),
            )
        })
        .await?;

        let composite = checked(device, "Composite Pipeline", || {
            fullscreen_pipeline(
                device,
                "Composite Pipeline",
                &layouts.composite,
                &paint_module,
                shader::COMPOSITE_FRAGMENT_ENTRY,
                surface_format,
                None,
            )
        })
        .await?;

        let boids = checked(device, "Boid Render Pipeline", || {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Boid Render Pipeline Layout"),
                bind_group_layouts: &[&layouts.view],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Boid Render Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &render_module,
                    entry_point: Some(shader::BOID_VERTEX_ENTRY),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<BoidRecord>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &shader::BOID_VERTEX_ATTRIBUTES,
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &render_module,
                    entry_point: Some(shader::BOID_FRAGMENT_ENTRY),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
        .await?;

        Ok(Self {
            compute,
            paint,
            erase,
            composite,
            boids,
        })
    }
}

impl GpuBackend {
    /// Set up the device, surface and every pipeline for `window`.
    ///
    /// Fails if no adapter is available or any shader or pipeline is
    /// rejected by the device.
    pub async fn new(window: Arc<Window>, boid_size: f32) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(GpuError::NoAdapter)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, &layouts, surface_format).await?;

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Boid Params Buffer"),
            size: std::mem::size_of::<BoidUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let brush_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Brush Buffer"),
            size: std::mem::size_of::<PaintUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let view_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Boid View Buffer"),
            contents: bytemuck::bytes_of(&RenderUniforms::new((config.width, config.height), boid_size)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let paint_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Paint Bind Group"),
            layout: &layouts.paint,
            entries: &[wgpu::BindGroupEntry {
                binding: paint_slots::BRUSH,
                resource: brush_buffer.as_entire_binding(),
            }],
        });
        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Boid View Bind Group"),
            layout: &layouts.view,
            entries: &[wgpu::BindGroupEntry {
                binding: render_slots::VIEW,
                resource: view_buffer.as_entire_binding(),
            }],
        });

        #[cfg(feature = "egui")]
        let egui = egui_integration::EguiIntegration::new(&device, surface_format, &window);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size: (size.width, size.height),
            layouts,
            pipelines,
            params_buffer,
            brush_buffer,
            view_buffer,
            paint_bind_group,
            view_bind_group,
            compute_bind_group: None,
            composite_bind_group: None,
            bound_boids: None,
            bound_mask: None,
            frame: None,
            boid_size,
            next_id: 1,
            #[cfg(feature = "egui")]
            egui,
            #[cfg(feature = "egui")]
            egui_output: None,
        })
    }

    /// Track a window resize. The surface is only reconfigured for non-zero
    /// sizes; a zero size makes the orchestrator skip frames.
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.size = (new_size.width, new_size.height);
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.write_view();
        }
    }

    /// Reconfigure the surface at its current size after it was lost or
    /// became outdated.
    pub fn reconfigure(&mut self) {
        log::warn!(
            "reconfiguring surface at {}x{}",
            self.config.width,
            self.config.height
        );
        self.surface.configure(&self.device, &self.config);
    }

    /// Boid length in pixels.
    pub fn boid_size(&self) -> f32 {
        self.boid_size
    }

    pub fn set_boid_size(&mut self, size: f32) {
        self.boid_size = size;
        self.write_view();
    }

    fn write_view(&self) {
        let view = RenderUniforms::new((self.config.width, self.config.height), self.boid_size);
        self.queue
            .write_buffer(&self.view_buffer, 0, bytemuck::bytes_of(&view));
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn rebuild_bind_groups(&mut self) {
        self.composite_bind_group = self.bound_mask.as_ref().map(|mask| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Composite Bind Group"),
                layout: &self.layouts.composite,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: paint_slots::BRUSH,
                        resource: self.brush_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: paint_slots::COLLISION_MASK,
                        resource: wgpu::BindingResource::TextureView(&mask.view),
                    },
                ],
            })
        });

        self.compute_bind_group = match (&self.bound_boids, &self.bound_mask) {
            (Some(boids), Some(mask)) => {
                Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Boid Compute Bind Group"),
                    layout: &self.layouts.compute,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: compute_slots::BOIDS_IN,
                            resource: boids.buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: compute_slots::PARAMS,
                            resource: self.params_buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: compute_slots::COLLISION_MASK,
                            resource: wgpu::BindingResource::TextureView(&mask.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: compute_slots::BOIDS_OUT,
                            resource: boids.scratch.as_entire_binding(),
                        },
                    ],
                }))
            }
            _ => None,
        };
    }

    /// Whether the egui overlay wants pointer or keyboard input.
    #[cfg(feature = "egui")]
    pub fn egui_on_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.egui.on_window_event(window, event)
    }

    /// Start an egui frame and hand back the context to build UI with.
    #[cfg(feature = "egui")]
    pub fn egui_begin(&mut self, window: &Window) -> egui::Context {
        self.egui.begin_frame(window);
        self.egui.ctx.clone()
    }

    /// Finish the egui frame; it is drawn on top of the next `draw`.
    #[cfg(feature = "egui")]
    pub fn egui_end(&mut self, window: &Window) {
        self.egui_output = Some(self.egui.end_frame(window));
    }

    #[cfg(feature = "egui")]
    fn draw_overlay(&mut self, frame: &mut Frame) {
        if let Some(output) = self.egui_output.take() {
            self.egui.paint(
                &self.device,
                &self.queue,
                &mut frame.encoder,
                &frame.view,
                [self.config.width, self.config.height],
                output,
            );
        }
    }
}

impl BoidAllocator for GpuBackend {
    type Boids = GpuBoids;

    fn upload_boids(&mut self, records: &[BoidRecord]) -> GpuBoids {
        // Zero-length buffers cannot be bound; keep one record of room.
        let size = (std::mem::size_of_val(records).max(std::mem::size_of::<BoidRecord>()))
            as wgpu::BufferAddress;

        let buffer = if records.is_empty() {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Boid Buffer"),
                size,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        } else {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Boid Buffer"),
                contents: bytemuck::cast_slice(records),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::COPY_DST,
            })
        };
        let scratch = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Boid Scratch Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        GpuBoids {
            id: self.next_id(),
            len: records.len() as u32,
            buffer: Arc::new(buffer),
            scratch: Arc::new(scratch),
        }
    }

    fn bind_boids(&mut self, boids: &GpuBoids) {
        self.bound_boids = Some(BoundBoids {
            id: boids.id,
            buffer: boids.buffer.clone(),
            scratch: boids.scratch.clone(),
        });
        self.rebuild_bind_groups();
    }

    fn unbind_boids(&mut self) {
        self.bound_boids = None;
        self.rebuild_bind_groups();
    }

    fn release_boids(&mut self, boids: GpuBoids) {
        debug_assert!(
            self.bound_boids.as_ref().map(|b| b.id) != Some(boids.id),
            "released a boid buffer that is still bound"
        );
        boids.buffer.destroy();
        boids.scratch.destroy();
    }
}

impl MaskAllocator for GpuBackend {
    type Mask = GpuMask;

    fn create_mask(&mut self, width: u32, height: u32) -> GpuMask {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Collision Mask"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: MASK_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        GpuMask {
            id: self.next_id(),
            width,
            height,
            texture,
            view: Arc::new(view),
        }
    }

    fn bind_mask(&mut self, mask: &GpuMask) {
        self.bound_mask = Some(BoundMask {
            id: mask.id,
            view: mask.view.clone(),
        });
        self.rebuild_bind_groups();
    }

    fn unbind_mask(&mut self) {
        self.bound_mask = None;
        self.rebuild_bind_groups();
    }

    fn release_mask(&mut self, mask: GpuMask) {
        debug_assert!(
            self.bound_mask.as_ref().map(|m| m.id) != Some(mask.id),
            "released a collision mask that is still bound"
        );
        mask.texture.destroy();
    }
}

impl Backend for GpuBackend {
    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn begin_frame(&mut self) -> Result<(), FrameError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.frame = Some(Frame {
            output,
            view,
            encoder,
        });
        Ok(())
    }

    fn paint(&mut self, mask: &mut GpuMask, brush: &PaintUniforms) {
        // The composite pass reads the brush too, so upload it even when idle.
        self.queue
            .write_buffer(&self.brush_buffer, 0, bytemuck::bytes_of(brush));

        if !brush.is_active() {
            return;
        }
        let Some(frame) = self.frame.as_mut() else {
            log::warn!("paint called outside a frame");
            return;
        };

        let pipeline = if brush.weight > 0.0 {
            &self.pipelines.paint
        } else {
            &self.pipelines.erase
        };

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Paint Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &mask.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.paint_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn simulate(&mut self, boids: &mut GpuBoids, _mask: &GpuMask, uniforms: &BoidUniforms) {
        debug_assert_eq!(boids.len, uniforms.num_boids);
        debug_assert_eq!(self.bound_boids.as_ref().map(|b| b.id), Some(boids.id));

        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(uniforms));

        let workgroups = uniforms.num_boids / WORKGROUP_WIDTH;
        if workgroups == 0 {
            return;
        }
        let (Some(frame), Some(bind_group)) = (self.frame.as_mut(), self.compute_bind_group.as_ref())
        else {
            log::warn!("simulate called without a frame or bound resources");
            return;
        };

        {
            let mut pass = frame.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Boid Compute Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.compute);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(workgroups, 1, 1);
        }

        let bytes = (boids.len as usize * std::mem::size_of::<BoidRecord>()) as wgpu::BufferAddress;
        frame
            .encoder
            .copy_buffer_to_buffer(&boids.scratch, 0, &boids.buffer, 0, bytes);
    }

    fn draw(&mut self, boids: &GpuBoids, _mask: &GpuMask, _brush: &PaintUniforms, count: u32) {
        let Some(mut frame) = self.frame.take() else {
            log::warn!("draw called outside a frame");
            return;
        };

        {
            let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(composite) = &self.composite_bind_group {
                pass.set_pipeline(&self.pipelines.composite);
                pass.set_bind_group(0, composite, &[]);
                pass.draw(0..3, 0..1);
            }

            if count > 0 {
                pass.set_pipeline(&self.pipelines.boids);
                pass.set_bind_group(0, &self.view_bind_group, &[]);
                pass.set_vertex_buffer(0, boids.buffer.slice(..));
                pass.draw(0..6, 0..count);
            }
        }

        #[cfg(feature = "egui")]
        self.draw_overlay(&mut frame);

        let Frame {
            output, encoder, ..
        } = frame;
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}
