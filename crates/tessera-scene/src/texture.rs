//! Texture path resolution, deduplication and CPU-side mip chain generation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::diagnostic::LoadDiagnostic;
use crate::error::SceneError;

/// The parts of a glTF image that feed path resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRef {
    pub uri: Option<String>,
    pub name: Option<String>,
    pub mime_type: Option<String>,
}

impl ImageRef {
    pub fn from_gltf(image: &gltf::Image<'_>) -> Self {
        let name = image.name().map(str::to_owned);
        match image.source() {
            gltf::image::Source::Uri { uri, mime_type } => Self {
                uri: Some(uri.to_owned()),
                name,
                mime_type: mime_type.map(str::to_owned),
            },
            gltf::image::Source::View { mime_type, .. } => Self {
                uri: None,
                name,
                mime_type: Some(mime_type.to_owned()),
            },
        }
    }
}

/// File extension implied by an image MIME type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/png" => Some("png"),
        "image/jpg" | "image/jpeg" => Some("jpg"),
        _ => None,
    }
}

/// Canonical on-disk path of an image.
///
/// External URIs resolve against `base_dir`. Otherwise the image name is used,
/// with an extension derived from the MIME type when the name has none.
/// Returns `None` when neither a usable URI nor a name exists.
pub fn resolve_texture_path(base_dir: &Path, image: &ImageRef) -> Option<PathBuf> {
    if let Some(uri) = image.uri.as_deref().filter(|u| !u.starts_with("data:")) {
        return Some(base_dir.join(uri));
    }

    let name = image.name.as_deref().filter(|n| !n.is_empty())?;
    let mut path = base_dir.join(name);
    if path.extension().is_none() {
        if let Some(ext) = image.mime_type.as_deref().and_then(extension_for_mime) {
            path.set_extension(ext);
        }
    }
    Some(path)
}

// ── registry ──────────────────────────────────────────────────────────────

/// Ordered set of unique texture paths.
///
/// Indices are assigned on first sight and never change.
#[derive(Debug, Clone, Default)]
pub struct TextureRegistry {
    paths: Vec<PathBuf>,
    index: HashMap<PathBuf, u32>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for `path`, registering it if it has not been seen.
    pub fn resolve(&mut self, path: PathBuf) -> u32 {
        if let Some(&i) = self.index.get(&path) {
            return i;
        }
        let i = self.paths.len() as u32;
        self.paths.push(path.clone());
        self.index.insert(path, i);
        log::debug!("texture {i}: {}", self.paths[i as usize].display());
        i
    }

    pub fn get(&self, path: &Path) -> Option<u32> {
        self.index.get(path).copied()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

// ── images ────────────────────────────────────────────────────────────────

/// Number of mip levels allocated for a `width` x `height` texture.
///
/// The chain stops one level short of 1x1 for square power-of-two sizes.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    (u32::BITS - 1 - largest.leading_zeros()).max(1)
}

/// One RGBA8 mip level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// A decoded image with its full mip chain, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub levels: Vec<MipLevel>,
}

impl TextureImage {
    /// Decodes an image file to RGBA8 and builds its mip chain.
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let rgba = image::open(path)
            .map_err(|source| SceneError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();

        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(SceneError::EmptyImage {
                path: path.to_path_buf(),
            });
        }
        Ok(Self::from_rgba(rgba))
    }

    /// 1x1 opaque white, used in place of images that fail to load.
    pub fn white() -> Self {
        Self::from_rgba(RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])))
    }

    pub fn from_rgba(base: RgbaImage) -> Self {
        let (width, height) = base.dimensions();
        let count = mip_level_count(width, height);

        let mut levels = Vec::with_capacity(count as usize);
        for level in 1..count {
            let w = (width >> level).max(1);
            let h = (height >> level).max(1);
            let scaled = imageops::resize(&base, w, h, FilterType::Triangle);
            levels.push(MipLevel {
                width: w,
                height: h,
                data: scaled.into_raw(),
            });
        }
        levels.insert(
            0,
            MipLevel {
                width,
                height,
                data: base.into_raw(),
            },
        );

        Self {
            width,
            height,
            levels,
        }
    }
}

/// Decodes every registered texture in index order.
///
/// A file that cannot be loaded is replaced by [`TextureImage::white`] so the
/// returned list always lines up with the registry.
pub fn load_textures(
    registry: &TextureRegistry,
    diagnostics: &mut Vec<LoadDiagnostic>,
) -> Vec<TextureImage> {
    registry
        .paths()
        .iter()
        .map(|path| {
            TextureImage::load(path).unwrap_or_else(|e| {
                diagnostics.push(LoadDiagnostic::ImageLoadFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                });
                TextureImage::white()
            })
        })
        .collect()
}
