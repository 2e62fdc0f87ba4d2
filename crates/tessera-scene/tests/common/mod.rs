//! In-memory GLB construction for loader tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

const GLB_MAGIC: &[u8; 4] = b"glTF";
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

pub const U8: u32 = 5121;
pub const U16: u32 = 5123;
pub const U32: u32 = 5125;
pub const F32: u32 = 5126;

/// Builds a single-buffer binary glTF file piece by piece.
///
/// Every `add_*` method returns the glTF index of what it added.
#[derive(Default)]
pub struct GlbBuilder {
    bin: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
    images: Vec<Value>,
    textures: Vec<Value>,
    materials: Vec<Value>,
    meshes: Vec<Value>,
    nodes: Vec<Value>,
    roots: Vec<usize>,
}

impl GlbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_view(&mut self, bytes: &[u8]) -> usize {
        while self.bin.len() % 4 != 0 {
            self.bin.push(0);
        }
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": self.bin.len(),
            "byteLength": bytes.len(),
        }));
        self.bin.extend_from_slice(bytes);
        self.views.len() - 1
    }

    pub fn add_accessor(&mut self, bytes: &[u8], component_type: u32, count: usize, ty: &str) -> usize {
        let view = self.add_view(bytes);
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": component_type,
            "count": count,
            "type": ty,
        }));
        self.accessors.len() - 1
    }

    /// POSITION accessor with no buffer view; readers see all zeros.
    pub fn add_positions_without_view(&mut self, count: usize) -> usize {
        self.accessors.push(json!({
            "componentType": F32,
            "count": count,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [0.0, 0.0, 0.0],
        }));
        self.accessors.len() - 1
    }

    pub fn add_positions(&mut self, positions: &[[f32; 3]]) -> usize {
        let bytes: Vec<u8> = positions
            .iter()
            .flatten()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let accessor = self.add_accessor(&bytes, F32, positions.len(), "VEC3");

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in positions {
            for i in 0..3 {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        self.accessors[accessor]["min"] = json!(min);
        self.accessors[accessor]["max"] = json!(max);
        accessor
    }

    pub fn add_indices_u8(&mut self, indices: &[u8]) -> usize {
        self.add_accessor(indices, U8, indices.len(), "SCALAR")
    }

    pub fn add_indices_u16(&mut self, indices: &[u16]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.add_accessor(&bytes, U16, indices.len(), "SCALAR")
    }

    pub fn add_indices_u32(&mut self, indices: &[u32]) -> usize {
        let bytes: Vec<u8> = indices.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.add_accessor(&bytes, U32, indices.len(), "SCALAR")
    }

    /// Adds an image referenced by URI plus a texture sampling it.
    pub fn add_texture_uri(&mut self, uri: &str) -> usize {
        self.images.push(json!({ "uri": uri }));
        self.push_texture()
    }

    /// Adds an image stored in the binary chunk, identified only by name.
    pub fn add_texture_embedded(&mut self, name: &str, mime_type: &str) -> usize {
        let view = self.add_view(&[0u8; 4]);
        self.images.push(json!({
            "name": name,
            "bufferView": view,
            "mimeType": mime_type,
        }));
        self.push_texture()
    }

    fn push_texture(&mut self) -> usize {
        self.textures
            .push(json!({ "source": self.images.len() - 1 }));
        self.textures.len() - 1
    }

    pub fn add_material(&mut self, base_color_texture: Option<usize>) -> usize {
        let pbr = match base_color_texture {
            Some(t) => json!({ "baseColorTexture": { "index": t } }),
            None => json!({ "baseColorFactor": [1.0, 1.0, 1.0, 1.0] }),
        };
        self.materials.push(json!({ "pbrMetallicRoughness": pbr }));
        self.materials.len() - 1
    }

    pub fn add_mesh(&mut self, primitives: Vec<Value>) -> usize {
        self.meshes.push(json!({ "primitives": primitives }));
        self.meshes.len() - 1
    }

    pub fn add_node(&mut self, mesh: Option<usize>, children: &[usize]) -> usize {
        let mut node = json!({});
        if let Some(m) = mesh {
            node["mesh"] = json!(m);
        }
        if !children.is_empty() {
            node["children"] = json!(children);
        }
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn translate(&mut self, node: usize, t: [f32; 3]) {
        self.nodes[node]["translation"] = json!(t);
    }

    pub fn add_root(&mut self, node: usize) {
        self.roots.push(node);
    }

    /// Adds a unit triangle with u16 indices and returns a primitive using it.
    pub fn triangle(&mut self, material: Option<usize>) -> Value {
        let pos = self.add_positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let idx = self.add_indices_u16(&[0, 1, 2]);
        primitive(pos, Some(idx), material)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bin = self.bin.clone();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let mut doc = json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": self.roots }],
            "nodes": self.nodes,
            "meshes": self.meshes,
            "accessors": self.accessors,
            "bufferViews": self.views,
            "buffers": [{ "byteLength": bin.len() }],
        });
        if !self.images.is_empty() {
            doc["images"] = json!(self.images);
            doc["textures"] = json!(self.textures);
        }
        if !self.materials.is_empty() {
            doc["materials"] = json!(self.materials);
        }

        let mut json_bytes = serde_json::to_vec(&doc).expect("serialize glTF json");
        while json_bytes.len() % 4 != 0 {
            json_bytes.push(b' ');
        }

        let total = 12 + 8 + json_bytes.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(GLB_MAGIC);
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
        out.extend_from_slice(&json_bytes);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&bin);
        out
    }

    /// Writes the GLB into `dir` and returns its path.
    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).expect("write glb");
        path
    }
}

pub fn primitive(positions: usize, indices: Option<usize>, material: Option<usize>) -> Value {
    let mut p = json!({ "attributes": { "POSITION": positions } });
    if let Some(i) = indices {
        p["indices"] = json!(i);
    }
    if let Some(m) = material {
        p["material"] = json!(m);
    }
    p
}

/// Writes a solid-color PNG fixture.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]))
        .save(&path)
        .expect("write png");
    path
}
