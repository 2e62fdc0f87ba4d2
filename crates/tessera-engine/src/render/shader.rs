use std::path::{Path, PathBuf};

use glam::Mat4;

use crate::render::{ModelLayouts, RenderCtx};

/// WGSL program used when the application does not supply its own.
pub const DEFAULT_MODEL_SHADER: &str = include_str!("shaders/model.wgsl");

#[derive(Debug, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to read shader {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader `{label}` failed to compile:\n{messages}")]
    Compile { label: String, messages: String },
}

/// A compiled model pipeline and its camera uniform.
///
/// The camera buffer holds two matrices: projection at slot 0, view at slot 1.
pub struct Shader {
    pipeline: wgpu::RenderPipeline,
    camera_ubo: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
}

impl Shader {
    pub const PROJECTION: u32 = 0;
    pub const VIEW: u32 = 1;
    const CAMERA_SLOTS: u64 = 2;
    const MATRIX_SIZE: u64 = std::mem::size_of::<Mat4>() as u64;

    /// Compiles `source` and builds the model pipeline around it.
    ///
    /// Entry points are `vs_main` and `fs_main`.
    pub fn new(
        ctx: &RenderCtx<'_>,
        label: &str,
        source: &str,
        layouts: &ModelLayouts,
    ) -> Result<Self, ShaderError> {
        let module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let info = pollster::block_on(module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
            .map(|m| match &m.location {
                Some(loc) => format!("{}:{}: {}", loc.line_number, loc.line_position, m.message),
                None => m.message.clone(),
            })
            .collect();
        if !errors.is_empty() {
            return Err(ShaderError::Compile {
                label: label.to_owned(),
                messages: errors.join("\n"),
            });
        }

        let camera_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tessera camera bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            Self::CAMERA_SLOTS * Self::MATRIX_SIZE,
                        ),
                    },
                    count: None,
                }],
            });

        let camera_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera camera ubo"),
            size: Self::CAMERA_SLOTS * Self::MATRIX_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera camera bind group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_ubo.as_entire_binding(),
            }],
        });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tessera model pipeline layout"),
                bind_group_layouts: &[&camera_layout, &layouts.transforms, &layouts.batch],
                immediate_size: 0,
            });

        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[ModelLayouts::vertex_layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: Some(wgpu::DepthStencilState {
                    format: ctx.depth_format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        let shader = Self {
            pipeline,
            camera_ubo,
            camera_bind_group,
        };
        shader.set_matrix(ctx.queue, Self::PROJECTION, &Mat4::IDENTITY);
        shader.set_matrix(ctx.queue, Self::VIEW, &Mat4::IDENTITY);

        log::debug!("compiled shader {label}");
        Ok(shader)
    }

    /// The built-in model shader.
    pub fn default_model(ctx: &RenderCtx<'_>, layouts: &ModelLayouts) -> Result<Self, ShaderError> {
        Self::new(ctx, "tessera model shader", DEFAULT_MODEL_SHADER, layouts)
    }

    /// Reads WGSL from `path` and compiles it.
    pub fn from_file(
        ctx: &RenderCtx<'_>,
        path: &Path,
        layouts: &ModelLayouts,
    ) -> Result<Self, ShaderError> {
        let source = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(ctx, &path.display().to_string(), &source, layouts)
    }

    /// Sets the pipeline and the camera group (group 0).
    pub fn bind(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, &self.camera_bind_group, &[]);
    }

    /// Writes a matrix into camera slot `slot` ([`Self::PROJECTION`] or [`Self::VIEW`]).
    pub fn set_matrix(&self, queue: &wgpu::Queue, slot: u32, matrix: &Mat4) {
        if u64::from(slot) >= Self::CAMERA_SLOTS {
            log::warn!("camera slot {slot} out of range; ignored");
            return;
        }
        queue.write_buffer(
            &self.camera_ubo,
            u64::from(slot) * Self::MATRIX_SIZE,
            bytemuck::bytes_of(matrix),
        );
    }
}
