//! Tessera scene crate.
//!
//! CPU side of the loading pipeline: glTF import, accessor decoding, texture
//! path deduplication, scene flattening, buffer packing and per-frame batch
//! building. Nothing here touches the GPU; the engine crate feeds the results
//! into wgpu.

pub mod accessor;
pub mod batch;
pub mod decode;
pub mod diagnostic;
pub mod flatten;
pub mod graph;
pub mod import;
pub mod pack;
pub mod texture;

mod error;
mod vertex;

pub use batch::{build_batches, Batch, DrawIndexedIndirect, ObjectData, TEXTURES_PER_BATCH};
pub use diagnostic::{LoadDiagnostic, PrimitiveLocation};
pub use error::SceneError;
pub use flatten::{flatten, FlattenedScene, MeshDescriptor, MeshLibrary, SENTINEL_TEXTURE};
pub use graph::{SceneGraph, SceneNode};
pub use import::{load_scene, SceneImport};
pub use pack::{pack, BufferSizes, CpuPackTarget, Mesh, PackError, PackTarget};
pub use texture::{load_textures, TextureImage, TextureRegistry};
pub use vertex::Vertex;
