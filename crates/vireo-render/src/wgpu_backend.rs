//! wgpu implementation of the [`RenderBackend`] boundary.
//!
//! The renderer issues draws while no render pass is open, so this backend
//! records them: vertex traffic accumulates in a per-frame stream, draw calls
//! become index ranges, and [`WgpuBackend::submit`] replays everything into a
//! caller-provided render pass. Pre-batched draws get transient buffers of
//! their own.

use std::sync::Arc;

use ahash::AHashMap;
use glam::Mat4;
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::arena::QuadArena;
use crate::backend::RenderBackend;
use crate::blend::BlendMode;
use crate::error::{RenderError, RenderResult};
use crate::material::{PipelineState, TextureHandle};
use crate::renderer::MAX_QUAD_CAPACITY;
use crate::vertex::{INDICES_PER_QUAD, QuadVertex, VERTICES_PER_QUAD};

/// A globally shared graphics context.
pub struct GraphicsContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GraphicsContext {
    /// Creates a headless graphics context synchronously.
    ///
    /// See [`GraphicsContext::new_headless`] for the asynchronous version.
    pub fn new_headless_sync() -> RenderResult<Arc<Self>> {
        pollster::block_on(Self::new_headless())
    }

    /// Creates a headless graphics context (no surface requirement).
    pub async fn new_headless() -> RenderResult<Arc<Self>> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::BackendUnavailable {
                message: e.to_string(),
            })?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                ..Default::default()
            })
            .await
            .map_err(|e| RenderError::BackendUnavailable {
                message: e.to_string(),
            })?;

        Ok(Arc::new(Self {
            instance,
            adapter,
            device,
            queue,
        }))
    }
}

/// A draw recorded during `render()`, replayed by `submit()`.
enum RecordedDraw {
    /// Indexed draw out of the shared vertex stream.
    Batched {
        blend: BlendMode,
        texture: TextureHandle,
        first_vertex: i32,
        index_count: u32,
    },
    /// Indexed draw out of transient per-command buffers.
    External {
        blend: BlendMode,
        texture: TextureHandle,
        vertex_buffer: wgpu::Buffer,
        index_buffer: wgpu::Buffer,
        index_count: u32,
    },
}

impl RecordedDraw {
    fn blend(&self) -> BlendMode {
        match self {
            RecordedDraw::Batched { blend, .. } | RecordedDraw::External { blend, .. } => *blend,
        }
    }
}

/// [`RenderBackend`] over wgpu.
///
/// Every pipeline state is drawn with the built-in textured-quad shader; the
/// program handle still separates batches, it just does not select a
/// different module here. Textures are registered up front with
/// [`register_texture`](Self::register_texture); an unregistered handle falls
/// back to the built-in 1x1 white texture.
pub struct WgpuBackend {
    context: Arc<GraphicsContext>,
    pipelines: AHashMap<BlendMode, wgpu::RenderPipeline>,
    pipeline_layout: wgpu::PipelineLayout,
    shader: wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    texture_layout: wgpu::BindGroupLayout,
    textures: AHashMap<TextureHandle, wgpu::BindGroup>,
    projection_buffer: wgpu::Buffer,
    projection_bind_group: wgpu::BindGroup,
    // Shared quad buffers. The vertex buffer grows when a frame streams more
    // data than the current allocation; the index buffer holds the canonical
    // pattern for one full arena and never changes.
    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,
    index_buffer: wgpu::Buffer,
    // Per-frame state.
    stream: Vec<QuadVertex>,
    run_start: Option<usize>,
    draws: Vec<RecordedDraw>,
    // Keep the fallback texture alive.
    _white_texture: wgpu::Texture,
}

impl WgpuBackend {
    pub fn new(
        context: Arc<GraphicsContext>,
        format: wgpu::TextureFormat,
        quad_capacity: usize,
    ) -> Self {
        debug_assert!(quad_capacity > 0 && quad_capacity <= MAX_QUAD_CAPACITY);
        let device = &context.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad_batch_shader"),
            source: wgpu::ShaderSource::Wgsl(QUAD_SHADER.into()),
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quad_batch_texture_layout"),
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

        let projection_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("quad_batch_projection_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let projection_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quad_batch_projection"),
            size: 64, // mat4x4<f32>
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        context.queue.write_buffer(
            &projection_buffer,
            0,
            bytemuck::cast_slice(&Mat4::IDENTITY.to_cols_array()),
        );

        let projection_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quad_batch_projection_bg"),
            layout: &projection_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: projection_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quad_batch_pipeline_layout"),
            bind_group_layouts: &[&texture_layout, &projection_layout],
            push_constant_ranges: &[],
        });

        let vertex_capacity = quad_capacity * VERTICES_PER_QUAD;
        let vertex_buffer = create_vertex_buffer(device, vertex_capacity);

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_batch_index_buffer"),
            contents: bytemuck::cast_slice(&QuadArena::index_pattern(quad_capacity)),
            usage: wgpu::BufferUsages::INDEX,
        });

        let (white_texture, white_view, white_sampler) =
            create_fallback_texture(device, &context.queue);
        let white_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quad_batch_white_bg"),
            layout: &texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&white_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&white_sampler),
                },
            ],
        });

        let mut textures = AHashMap::new();
        textures.insert(TextureHandle::WHITE, white_bind_group);

        Self {
            context,
            pipelines: AHashMap::new(),
            pipeline_layout,
            shader,
            format,
            texture_layout,
            textures,
            projection_buffer,
            projection_bind_group,
            vertex_buffer,
            vertex_capacity,
            index_buffer,
            stream: Vec::with_capacity(vertex_capacity),
            run_start: None,
            draws: Vec::new(),
            _white_texture: white_texture,
        }
    }

    /// Register the texture a [`TextureHandle`] resolves to at draw time.
    pub fn register_texture(
        &mut self,
        handle: TextureHandle,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) {
        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("quad_batch_texture_bg"),
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });
        self.textures.insert(handle, bind_group);
    }

    /// Upload the projection matrix applied to every vertex.
    pub fn set_projection(&self, projection: Mat4) {
        self.context.queue.write_buffer(
            &self.projection_buffer,
            0,
            bytemuck::cast_slice(&projection.to_cols_array()),
        );
    }

    /// Replay the draws recorded by the last `render()` into a render pass.
    pub fn submit(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(1, &self.projection_bind_group, &[]);
        for draw in &self.draws {
            let pipeline = &self.pipelines[&draw.blend()];
            pass.set_pipeline(pipeline);
            match draw {
                RecordedDraw::Batched {
                    texture,
                    first_vertex,
                    index_count,
                    ..
                } => {
                    pass.set_bind_group(0, self.bind_group_for(*texture), &[]);
                    pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                    pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    pass.draw_indexed(0..*index_count, *first_vertex, 0..1);
                }
                RecordedDraw::External {
                    texture,
                    vertex_buffer,
                    index_buffer,
                    index_count,
                    ..
                } => {
                    pass.set_bind_group(0, self.bind_group_for(*texture), &[]);
                    pass.set_vertex_buffer(0, vertex_buffer.slice(..));
                    pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    pass.draw_indexed(0..*index_count, 0, 0..1);
                }
            }
        }
    }

    fn bind_group_for(&self, texture: TextureHandle) -> &wgpu::BindGroup {
        self.textures.get(&texture).unwrap_or_else(|| {
            warn!(handle = texture.0, "unregistered texture, using fallback");
            &self.textures[&TextureHandle::WHITE]
        })
    }

    fn ensure_pipeline(&mut self, blend: BlendMode) {
        if self.pipelines.contains_key(&blend) {
            return;
        }
        debug!(?blend, "creating quad batch pipeline");
        let pipeline =
            self.context
                .device
                .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("quad_batch_pipeline"),
                    layout: Some(&self.pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &self.shader,
                        entry_point: Some("vs_main"),
                        buffers: &[QuadVertex::layout()],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &self.shader,
                        entry_point: Some("fs_main"),
                        targets: &[Some(blend.to_color_target_state(self.format))],
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        strip_index_format: None,
                        front_face: wgpu::FrontFace::Ccw,
                        cull_mode: None, // 2D quads, no culling
                        polygon_mode: wgpu::PolygonMode::Fill,
                        unclipped_depth: false,
                        conservative: false,
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });
        self.pipelines.insert(blend, pipeline);
    }
}

impl RenderBackend for WgpuBackend {
    fn begin_frame(&mut self) {
        self.stream.clear();
        self.run_start = None;
        self.draws.clear();
    }

    fn upload_vertices(&mut self, _first_vertex: usize, vertices: &[QuadVertex]) {
        // The renderer's buffer offsets wrap when its arena rewinds; the
        // stream keeps every upload of the frame, so draws are recorded
        // against stream positions instead.
        if self.run_start.is_none() {
            self.run_start = Some(self.stream.len());
        }
        self.stream.extend_from_slice(vertices);
    }

    fn draw_quads(&mut self, state: &PipelineState, _first_quad: usize, quad_count: usize) {
        let start = self
            .run_start
            .take()
            .expect("draw_quads without preceding uploads");
        debug_assert_eq!(self.stream.len() - start, quad_count * VERTICES_PER_QUAD);
        self.draws.push(RecordedDraw::Batched {
            blend: state.blend,
            texture: state.texture,
            first_vertex: start as i32,
            index_count: (quad_count * INDICES_PER_QUAD) as u32,
        });
    }

    fn draw_external(&mut self, state: &PipelineState, vertices: &[QuadVertex], indices: &[u16]) {
        let device = &self.context.device;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_batch_external_vb"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad_batch_external_ib"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.draws.push(RecordedDraw::External {
            blend: state.blend,
            texture: state.texture,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        });
    }

    fn end_frame(&mut self) {
        if self.stream.len() > self.vertex_capacity {
            // A frame streamed more than one arena's worth; grow once and
            // keep the larger allocation.
            self.vertex_capacity = self.stream.len().next_power_of_two();
            debug!(vertices = self.vertex_capacity, "growing shared vertex buffer");
            self.vertex_buffer = create_vertex_buffer(&self.context.device, self.vertex_capacity);
        }
        if !self.stream.is_empty() {
            self.context.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&self.stream),
            );
        }
        let blends: Vec<BlendMode> = self.draws.iter().map(RecordedDraw::blend).collect();
        for blend in blends {
            self.ensure_pipeline(blend);
        }
    }
}

fn create_vertex_buffer(device: &wgpu::Device, vertex_capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("quad_batch_vertex_buffer"),
        size: vertex_capacity as u64 * QuadVertex::SIZE,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// A 1x1 white fallback texture for untextured quads.
fn create_fallback_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> (wgpu::Texture, wgpu::TextureView, wgpu::Sampler) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("quad_batch_white_texture"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &[255, 255, 255, 255],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("quad_batch_white_sampler"),
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });
    (texture, view, sampler)
}

/// WGSL shader: projected position, vertex color times sampled texel.
const QUAD_SHADER: &str = r#"
struct Projection {
    matrix: mat4x4<f32>,
}

@group(0) @binding(0) var t_color: texture_2d<f32>;
@group(0) @binding(1) var s_color: sampler;
@group(1) @binding(0) var<uniform> projection: Projection;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) tex_coord: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) tex_coord: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.position = projection.matrix * vec4<f32>(input.position, 1.0);
    output.color = input.color;
    output.tex_coord = input.tex_coord;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(t_color, s_color, input.tex_coord) * input.color;
}
"#;
