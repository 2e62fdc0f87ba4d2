//! GPU-resident scene: packed geometry, textures and per-batch draw data.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use glam::Mat4;
use tessera_scene::{
    build_batches, load_scene, load_textures, pack, Batch, BufferSizes, DrawIndexedIndirect,
    FlattenedScene, Mesh, ObjectData, PackTarget, TextureImage, Vertex, TEXTURES_PER_BATCH,
};

use crate::render::texture::{create_scene_sampler, GpuTexture};
use crate::render::{RenderCtx, RenderTarget, Shader};

// ── layouts ───────────────────────────────────────────────────────────────

/// Bind group layouts and vertex layout shared by the model and its shader.
///
/// Group 0 belongs to the shader (camera). Group 1 holds the transform table.
/// Group 2 holds per-batch object data, the sampler and 16 texture slots.
pub struct ModelLayouts {
    pub transforms: wgpu::BindGroupLayout,
    pub batch: wgpu::BindGroupLayout,
}

impl ModelLayouts {
    pub const TRANSFORM_GROUP: u32 = 1;
    pub const BATCH_GROUP: u32 = 2;

    /// Binding of texture slot 0 inside the batch group.
    pub const FIRST_TEXTURE_BINDING: u32 = 2;

    const VERTEX_ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2, // uv
        3 => Float32x4  // tangent
    ];

    pub fn new(device: &wgpu::Device) -> Self {
        let transforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera transforms bgl"),
            entries: &[storage_entry(0, wgpu::ShaderStages::VERTEX)],
        });

        let mut entries = vec![
            storage_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        entries.extend((0..TEXTURES_PER_BATCH).map(|slot| wgpu::BindGroupLayoutEntry {
            binding: Self::FIRST_TEXTURE_BINDING + slot,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        }));

        let batch = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tessera batch bgl"),
            entries: &entries,
        });

        Self { transforms, batch }
    }

    /// The single interleaved vertex buffer layout.
    pub fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: Vertex::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::VERTEX_ATTRS,
        }
    }
}

fn storage_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

// ── packing ───────────────────────────────────────────────────────────────

/// [`PackTarget`] over two exactly sized wgpu buffers.
struct GpuPackTarget<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    buffers: Option<(wgpu::Buffer, wgpu::Buffer)>,
}

impl<'a> GpuPackTarget<'a> {
    fn new(ctx: &RenderCtx<'a>) -> Self {
        Self {
            device: ctx.device,
            queue: ctx.queue,
            buffers: None,
        }
    }
}

impl PackTarget for GpuPackTarget<'_> {
    fn allocate(&mut self, sizes: BufferSizes) {
        let vertex = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera vertex buffer"),
            size: sizes.vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera index buffer"),
            size: sizes.index_bytes,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.buffers = Some((vertex, index));
    }

    fn write_vertices(&mut self, offset: u64, bytes: &[u8]) {
        if let Some((vertex, _)) = &self.buffers
            && !bytes.is_empty()
        {
            self.queue.write_buffer(vertex, offset, bytes);
        }
    }

    fn write_indices(&mut self, offset: u64, bytes: &[u8]) {
        if let Some((_, index)) = &self.buffers
            && !bytes.is_empty()
        {
            self.queue.write_buffer(index, offset, bytes);
        }
    }
}

// ── per-batch resources ───────────────────────────────────────────────────

/// Object and indirect buffers for one batch, plus its bind group.
///
/// Buffers grow to the next power of two and are otherwise reused.
struct BatchResources {
    objects: wgpu::Buffer,
    commands: wgpu::Buffer,
    capacity: usize,
    bind_group: wgpu::BindGroup,
}

// ── model ─────────────────────────────────────────────────────────────────

/// Owns every GPU resource of a loaded scene.
///
/// Dropping the model releases its buffers and textures.
pub struct Model {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    meshes: Vec<Mesh>,

    transforms: Vec<Mat4>,
    transform_buffer: wgpu::Buffer,
    transform_bind_group: wgpu::BindGroup,

    textures: Vec<GpuTexture>,
    fallback: GpuTexture,
    sampler: wgpu::Sampler,

    batches: Vec<Batch>,
    batch_resources: BTreeMap<u32, BatchResources>,
}

impl Model {
    /// Loads a glTF file, decodes its textures and uploads everything.
    ///
    /// Asset gaps are logged as warnings and do not fail the load.
    pub fn load(ctx: &RenderCtx<'_>, layouts: &ModelLayouts, path: &Path) -> Result<Self> {
        let mut scene =
            load_scene(path).with_context(|| format!("failed to load scene {}", path.display()))?;
        let images = load_textures(&scene.textures, &mut scene.diagnostics);

        for d in &scene.diagnostics {
            log::warn!("{}: {d}", path.display());
        }

        let model = Self::from_scene(ctx, layouts, &scene, &images)?;
        log::info!(
            "loaded {}: {} meshes, {} textures, {} transforms, {} diagnostics",
            path.display(),
            model.meshes.len(),
            model.textures.len(),
            model.transforms.len(),
            scene.diagnostics.len()
        );
        Ok(model)
    }

    /// Uploads an already flattened scene. `images` lines up with `scene.textures`.
    pub fn from_scene(
        ctx: &RenderCtx<'_>,
        layouts: &ModelLayouts,
        scene: &FlattenedScene,
        images: &[TextureImage],
    ) -> Result<Self> {
        anyhow::ensure!(
            images.len() == scene.textures.len(),
            "{} images for {} registered textures",
            images.len(),
            scene.textures.len()
        );

        let mut target = GpuPackTarget::new(ctx);
        let meshes = pack(&scene.descriptors, &mut target).context("failed to pack scene buffers")?;
        let (vertex_buffer, index_buffer) = target
            .buffers
            .context("packer did not allocate buffers")?;

        let textures = images
            .iter()
            .enumerate()
            .map(|(i, image)| GpuTexture::upload(ctx, &format!("scene texture {i}"), image))
            .collect();

        let transform_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera transform buffer"),
            size: (scene.transforms.len().max(1) * std::mem::size_of::<Mat4>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let transform_bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera transform bind group"),
            layout: &layouts.transforms,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            vertex_buffer,
            index_buffer,
            meshes,
            transforms: scene.transforms.clone(),
            transform_buffer,
            transform_bind_group,
            textures,
            fallback: GpuTexture::white(ctx),
            sampler: create_scene_sampler(ctx.device),
            batches: Vec::new(),
            batch_resources: BTreeMap::new(),
        })
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Batches built by the last [`prepare`](Self::prepare).
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    /// Rebuilds the batches from the mesh table and uploads this frame's
    /// transforms, object data and indirect commands.
    pub fn prepare(&mut self, ctx: &RenderCtx<'_>, layouts: &ModelLayouts) {
        self.batches = build_batches(&self.meshes);

        if !self.transforms.is_empty() {
            ctx.queue
                .write_buffer(&self.transform_buffer, 0, bytemuck::cast_slice(&self.transforms));
        }

        for batch in &self.batches {
            let needed = batch.commands.len();
            let stale = self
                .batch_resources
                .get(&batch.index)
                .is_none_or(|r| r.capacity < needed);
            if stale {
                let resources = self.create_batch_resources(ctx, layouts, batch, needed);
                self.batch_resources.insert(batch.index, resources);
            }

            if let Some(res) = self.batch_resources.get(&batch.index) {
                ctx.queue
                    .write_buffer(&res.objects, 0, bytemuck::cast_slice(&batch.objects));
                ctx.queue
                    .write_buffer(&res.commands, 0, bytemuck::cast_slice(&batch.commands));
            }
        }
    }

    /// Records one multi-draw per batch. Call after [`prepare`](Self::prepare).
    pub fn render(&self, target: &mut RenderTarget<'_>, shader: &Shader) {
        if !has_draws(
            self.vertex_buffer.size(),
            self.index_buffer.size(),
            &self.batches,
        ) {
            return;
        }

        let mut rpass = target.begin_pass("tessera model pass");
        shader.bind(&mut rpass);
        rpass.set_bind_group(ModelLayouts::TRANSFORM_GROUP, &self.transform_bind_group, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        rpass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

        for batch in &self.batches {
            let Some(res) = self.batch_resources.get(&batch.index) else {
                continue;
            };
            rpass.set_bind_group(ModelLayouts::BATCH_GROUP, &res.bind_group, &[]);
            rpass.multi_draw_indexed_indirect(&res.commands, 0, batch.commands.len() as u32);
        }
    }

    /// `prepare` followed by `render`.
    pub fn draw(
        &mut self,
        ctx: &RenderCtx<'_>,
        layouts: &ModelLayouts,
        target: &mut RenderTarget<'_>,
        shader: &Shader,
    ) {
        self.prepare(ctx, layouts);
        self.render(target, shader);
    }

    fn create_batch_resources(
        &self,
        ctx: &RenderCtx<'_>,
        layouts: &ModelLayouts,
        batch: &Batch,
        needed: usize,
    ) -> BatchResources {
        let capacity = needed.next_power_of_two().max(16);

        let objects = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera batch objects"),
            size: (capacity * std::mem::size_of::<ObjectData>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let commands = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessera batch commands"),
            size: (capacity * std::mem::size_of::<DrawIndexedIndirect>()) as u64,
            usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let views: Vec<&wgpu::TextureView> = batch
            .texture_bindings(self.textures.len() as u32)
            .iter()
            .map(|slot| match slot {
                Some(global) => self.textures[*global as usize].view(),
                None => self.fallback.view(),
            })
            .collect();

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: objects.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        entries.extend(views.iter().enumerate().map(|(slot, view)| wgpu::BindGroupEntry {
            binding: ModelLayouts::FIRST_TEXTURE_BINDING + slot as u32,
            resource: wgpu::BindingResource::TextureView(view),
        }));

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessera batch bind group"),
            layout: &layouts.batch,
            entries: &entries,
        });

        log::debug!(
            "batch {}: {} draws (capacity {capacity}), textures {:?}",
            batch.index,
            needed,
            batch.textures
        );

        BatchResources {
            objects,
            commands,
            capacity,
            bind_group,
        }
    }
}

/// Whether there is anything to record. Zero-sized buffers cannot be sliced.
fn has_draws(vertex_bytes: u64, index_bytes: u64, batches: &[Batch]) -> bool {
    vertex_bytes > 0 && index_bytes > 0 && batches.iter().any(|b| !b.commands.is_empty())
}
