use std::path::{Path, PathBuf};

use crate::decode::{decode_primitive, PrimitiveGeometry};
use crate::diagnostic::{LoadDiagnostic, PrimitiveLocation};
use crate::error::SceneError;
use crate::flatten::{flatten, FlattenedScene, MeshLibrary};
use crate::graph::SceneGraph;
use crate::texture::{resolve_texture_path, ImageRef};

/// A parsed glTF document with its buffers loaded.
///
/// Image files are not touched here; only their paths are resolved.
pub struct SceneImport {
    document: gltf::Document,
    buffers: Vec<gltf::buffer::Data>,
    base_dir: PathBuf,
}

impl SceneImport {
    /// Reads a `.gltf` or `.glb` file. Relative URIs resolve against its directory.
    pub fn open(path: &Path) -> Result<Self, SceneError> {
        let bytes = std::fs::read(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        Self::from_slice(&bytes, base_dir)
    }

    pub fn from_slice(bytes: &[u8], base_dir: impl Into<PathBuf>) -> Result<Self, SceneError> {
        let base_dir = base_dir.into();
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice_without_validation(bytes)?;
        validate(&document)?;
        let buffers = gltf::import_buffers(&document, Some(&base_dir), blob)?;

        log::debug!(
            "glTF: {} nodes, {} meshes, {} images, {} buffers",
            document.nodes().len(),
            document.meshes().len(),
            document.images().len(),
            buffers.len()
        );

        Ok(Self {
            document,
            buffers,
            base_dir,
        })
    }

    pub fn document(&self) -> &gltf::Document {
        &self.document
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn graph(&self) -> SceneGraph {
        SceneGraph::from_document(&self.document)
    }

    pub fn flatten(&self) -> FlattenedScene {
        flatten(&self.graph(), self)
    }

    fn primitive(&self, location: PrimitiveLocation) -> Option<gltf::Primitive<'_>> {
        self.document
            .meshes()
            .nth(location.mesh)?
            .primitives()
            .nth(location.primitive)
    }
}

impl MeshLibrary for SceneImport {
    fn primitive_count(&self, mesh: usize) -> usize {
        self.document
            .meshes()
            .nth(mesh)
            .map_or(0, |m| m.primitives().len())
    }

    fn decode(
        &self,
        location: PrimitiveLocation,
        diagnostics: &mut Vec<LoadDiagnostic>,
    ) -> PrimitiveGeometry {
        match self.primitive(location) {
            Some(p) => decode_primitive(
                &p,
                self.document.as_json(),
                &self.buffers,
                location,
                diagnostics,
            ),
            None => PrimitiveGeometry::default(),
        }
    }

    fn base_color_texture(
        &self,
        location: PrimitiveLocation,
        diagnostics: &mut Vec<LoadDiagnostic>,
    ) -> Option<PathBuf> {
        let primitive = self.primitive(location)?;
        let Some(info) = primitive
            .material()
            .pbr_metallic_roughness()
            .base_color_texture()
        else {
            diagnostics.push(LoadDiagnostic::MissingBaseColorTexture { location });
            return None;
        };

        let image = info.texture().source();
        let path = resolve_texture_path(&self.base_dir, &ImageRef::from_gltf(&image));
        if path.is_none() {
            diagnostics.push(LoadDiagnostic::UnresolvableImage {
                location,
                image: image.index(),
            });
        }
        path
    }
}

/// Runs glTF validation, letting unrecognized accessor component types through.
///
/// Those accessors are reported per primitive while decoding; every other
/// validation error still rejects the document.
fn validate(document: &gltf::Document) -> Result<(), gltf::Error> {
    use gltf::json::validation::{Error, Validate};
    use gltf::json::Path as JsonPath;

    let root = document.as_json();
    let mut errors = Vec::new();
    root.validate(root, JsonPath::new, &mut |path: &dyn Fn() -> JsonPath, error: Error| {
        let path = path();
        if !is_component_type_error(&path, &error) {
            errors.push((path, error));
        }
    });

    if errors.is_empty() {
        Ok(())
    } else {
        Err(gltf::Error::Validation(errors))
    }
}

fn is_component_type_error(path: &gltf::json::Path, error: &gltf::json::validation::Error) -> bool {
    let path = path.as_str();
    matches!(error, gltf::json::validation::Error::Invalid)
        && path.starts_with("accessors[")
        && path.ends_with("].componentType")
}

/// Opens and flattens a scene file in one step.
pub fn load_scene(path: &Path) -> Result<FlattenedScene, SceneError> {
    let scene = SceneImport::open(path)?.flatten();
    log::debug!(
        "{}: {} meshes, {} transforms, {} textures",
        path.display(),
        scene.descriptors.len(),
        scene.transforms.len(),
        scene.textures.len()
    );
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "accessors": [{
            "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
            "min": [0, 0, 0], "max": [1, 1, 0]
        }],
        "bufferViews": [{ "buffer": 0, "byteLength": 36 }],
        "buffers": [{
            "byteLength": 36,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAA"
        }]
    }"#;

    #[test]
    fn embedded_buffer_triangle_flattens() {
        let import = SceneImport::from_slice(TRIANGLE_GLTF.as_bytes(), "assets").unwrap();
        let flat = import.flatten();

        assert_eq!(flat.descriptors.len(), 1);
        let d = &flat.descriptors[0];
        assert_eq!(d.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(d.vertices[2].position, [0.0, 1.0, 0.0]);
        assert_eq!(d.indices, vec![0, 1, 2]);

        // No indices and the default material: both are reported.
        assert!(flat
            .diagnostics
            .iter()
            .any(|x| matches!(x, LoadDiagnostic::MissingIndices { .. })));
        assert!(flat
            .diagnostics
            .iter()
            .any(|x| matches!(x, LoadDiagnostic::MissingBaseColorTexture { .. })));
    }

    fn triangle_with_index_accessor(component_type: u32) -> String {
        let mut json: serde_json::Value = serde_json::from_str(TRIANGLE_GLTF).unwrap();
        json["meshes"][0]["primitives"][0]["indices"] = 1.into();
        json["accessors"].as_array_mut().unwrap().push(serde_json::json!({
            "bufferView": 0, "componentType": component_type, "count": 3, "type": "SCALAR"
        }));
        json.to_string()
    }

    #[test]
    fn unrecognized_index_type_degrades_instead_of_failing() {
        let json = triangle_with_index_accessor(5124);

        let flat = SceneImport::from_slice(json.as_bytes(), "assets")
            .unwrap()
            .flatten();

        assert_eq!(flat.descriptors.len(), 1);
        assert_eq!(flat.descriptors[0].vertices.len(), 3);
        assert!(flat.descriptors[0].indices.is_empty());
        assert!(flat.diagnostics.contains(&LoadDiagnostic::AccessorIssue {
            location: PrimitiveLocation { mesh: 0, primitive: 0 },
            attribute: "indices",
            error: crate::accessor::AccessorError::UnsupportedComponentType { accessor: 1 },
        }));
    }

    #[test]
    fn other_validation_errors_still_reject_the_document() {
        let json = TRIANGLE_GLTF.replace(r#""bufferView": 0"#, r#""bufferView": 9"#);
        let err = SceneImport::from_slice(json.as_bytes(), "assets").err();
        assert!(matches!(
            err,
            Some(SceneError::Gltf(gltf::Error::Validation(_)))
        ));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = SceneImport::from_slice(b"not a gltf", "").err();
        assert!(matches!(err, Some(SceneError::Gltf(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_scene(Path::new("/nonexistent/scene.gltf")).err();
        assert!(matches!(err, Some(SceneError::Io { .. })));
    }
}
