use std::path::PathBuf;

/// Fatal errors raised while importing a scene.
///
/// Recoverable gaps in the asset (missing attributes, untextured materials,
/// odd index types) are not errors; they surface as
/// [`LoadDiagnostic`](crate::LoadDiagnostic) values instead.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to parse glTF document: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image {} has zero size", .path.display())]
    EmptyImage { path: PathBuf },
}
