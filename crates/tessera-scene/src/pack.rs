//! Packing of flattened descriptors into two shared buffers.
//!
//! The packer is device-agnostic: it talks to a [`PackTarget`], which the engine
//! implements over wgpu buffers and tests implement over plain byte vectors.

use crate::batch::DrawIndexedIndirect;
use crate::flatten::MeshDescriptor;
use crate::vertex::Vertex;

/// A packed primitive, addressed in elements rather than bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Mesh {
    pub index_count: u32,
    /// First vertex of this primitive in the shared vertex buffer.
    pub vertex_offset: i32,
    /// First index of this primitive in the shared index buffer.
    pub index_offset: u32,
    pub transform_index: u32,
    pub base_color_texture: u32,
    pub normal_texture: u32,
}

impl Mesh {
    /// Indirect draw for this mesh with a single instance.
    ///
    /// `first_instance` is the mesh's position within its batch, which the
    /// shader uses to look up per-object data.
    pub fn indirect_command(&self, first_instance: u32) -> DrawIndexedIndirect {
        DrawIndexedIndirect {
            index_count: self.index_count,
            instance_count: 1,
            first_index: self.index_offset,
            base_vertex: self.vertex_offset,
            first_instance,
        }
    }
}

/// Total byte sizes of the packed buffers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct BufferSizes {
    pub vertex_bytes: u64,
    pub index_bytes: u64,
}

impl BufferSizes {
    pub fn total(descriptors: &[MeshDescriptor]) -> Self {
        descriptors.iter().fold(Self::default(), |acc, d| Self {
            vertex_bytes: acc.vertex_bytes + d.vertex_bytes(),
            index_bytes: acc.index_bytes + d.index_bytes(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackError {
    #[error("{kind} block at byte {offset} (+{len}) exceeds buffer size {size}")]
    OutOfRange {
        kind: &'static str,
        offset: u64,
        len: u64,
        size: u64,
    },

    #[error("{kind} offset {offset} does not fit a draw command")]
    Overflow { kind: &'static str, offset: u64 },
}

/// Destination of packed geometry.
///
/// `allocate` is called exactly once, before any write.
pub trait PackTarget {
    fn allocate(&mut self, sizes: BufferSizes);
    fn write_vertices(&mut self, offset: u64, bytes: &[u8]);
    fn write_indices(&mut self, offset: u64, bytes: &[u8]);
}

/// Packs descriptors into `target` and returns the persisted mesh table.
///
/// Buffers are sized to exactly the sum of all blocks. Each block is written at
/// the byte offset assigned during flattening.
pub fn pack<T: PackTarget + ?Sized>(
    descriptors: &[MeshDescriptor],
    target: &mut T,
) -> Result<Vec<Mesh>, PackError> {
    let sizes = BufferSizes::total(descriptors);

    // Validate everything first so a bad table never leaves half-written buffers.
    let mut meshes = Vec::with_capacity(descriptors.len());
    for d in descriptors {
        check_range("vertex", d.vertex_offset, d.vertex_bytes(), sizes.vertex_bytes)?;
        check_range("index", d.index_offset, d.index_bytes(), sizes.index_bytes)?;

        let vertex_offset = i32::try_from(d.vertex_offset / Vertex::STRIDE).map_err(|_| {
            PackError::Overflow {
                kind: "vertex",
                offset: d.vertex_offset,
            }
        })?;
        let index_offset = u32::try_from(d.index_offset / 4).map_err(|_| PackError::Overflow {
            kind: "index",
            offset: d.index_offset,
        })?;
        let index_count = u32::try_from(d.indices.len()).map_err(|_| PackError::Overflow {
            kind: "index count",
            offset: d.indices.len() as u64,
        })?;

        meshes.push(Mesh {
            index_count,
            vertex_offset,
            index_offset,
            transform_index: d.transform_index,
            base_color_texture: d.base_color_texture,
            normal_texture: d.normal_texture,
        });
    }

    target.allocate(sizes);
    for d in descriptors {
        target.write_vertices(d.vertex_offset, bytemuck::cast_slice(&d.vertices));
        target.write_indices(d.index_offset, bytemuck::cast_slice(&d.indices));
    }

    log::debug!(
        "packed {} meshes: {} vertex bytes, {} index bytes",
        meshes.len(),
        sizes.vertex_bytes,
        sizes.index_bytes
    );
    Ok(meshes)
}

fn check_range(kind: &'static str, offset: u64, len: u64, size: u64) -> Result<(), PackError> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(PackError::OutOfRange {
            kind,
            offset,
            len,
            size,
        }),
    }
}

/// In-memory [`PackTarget`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuPackTarget {
    pub vertices: Vec<u8>,
    pub indices: Vec<u8>,
    allocations: u32,
}

impl CpuPackTarget {
    pub fn allocations(&self) -> u32 {
        self.allocations
    }
}

impl PackTarget for CpuPackTarget {
    fn allocate(&mut self, sizes: BufferSizes) {
        self.allocations += 1;
        self.vertices = vec![0; sizes.vertex_bytes as usize];
        self.indices = vec![0; sizes.index_bytes as usize];
    }

    fn write_vertices(&mut self, offset: u64, bytes: &[u8]) {
        let start = offset as usize;
        self.vertices[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn write_indices(&mut self, offset: u64, bytes: &[u8]) {
        let start = offset as usize;
        self.indices[start..start + bytes.len()].copy_from_slice(bytes);
    }
}
