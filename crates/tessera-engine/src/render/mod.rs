//! GPU rendering subsystem.
//!
//! A [`Model`] owns the packed scene buffers and textures; a [`Shader`] owns the
//! pipeline and camera uniform. Both share the bind group layouts in
//! [`ModelLayouts`].

mod ctx;
mod model;
mod shader;
mod texture;

pub use ctx::{RenderCtx, RenderTarget};
pub use model::{Model, ModelLayouts};
pub use shader::{Shader, ShaderError, DEFAULT_MODEL_SHADER};
pub use texture::{create_scene_sampler, GpuTexture, TEXTURE_FORMAT};
