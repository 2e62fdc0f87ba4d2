use bytemuck::{Pod, Zeroable};

/// Shared vertex schema for every primitive in a scene.
///
/// Attributes a primitive does not provide stay zeroed.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

impl Vertex {
    /// Byte stride of one vertex in the packed vertex buffer.
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    pub const POSITION_OFFSET: u64 = std::mem::offset_of!(Vertex, position) as u64;
    pub const NORMAL_OFFSET: u64 = std::mem::offset_of!(Vertex, normal) as u64;
    pub const UV_OFFSET: u64 = std::mem::offset_of!(Vertex, uv) as u64;
    pub const TANGENT_OFFSET: u64 = std::mem::offset_of!(Vertex, tangent) as u64;
}
