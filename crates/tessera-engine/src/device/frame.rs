/// Represents a single acquired frame.
///
/// Holding the surface texture blocks acquisition of the next one, so finish
/// the frame with [`Gpu::submit`](super::Gpu::submit) promptly.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
