//! Breadth-first scene flattening into per-primitive mesh descriptors.

use std::collections::VecDeque;
use std::path::PathBuf;

use glam::Mat4;

use crate::decode::PrimitiveGeometry;
use crate::diagnostic::{LoadDiagnostic, PrimitiveLocation};
use crate::graph::SceneGraph;
use crate::texture::TextureRegistry;
use crate::vertex::Vertex;

/// Texture index used by primitives whose material has no base-color texture.
pub const SENTINEL_TEXTURE: u32 = 0;

/// Source of per-primitive geometry and material data, keyed by glTF mesh index.
pub trait MeshLibrary {
    fn primitive_count(&self, mesh: usize) -> usize;

    fn decode(
        &self,
        location: PrimitiveLocation,
        diagnostics: &mut Vec<LoadDiagnostic>,
    ) -> PrimitiveGeometry;

    /// Resolved path of the primitive's base-color image.
    ///
    /// Returns `None` (after recording why) when there is nothing to load.
    fn base_color_texture(
        &self,
        location: PrimitiveLocation,
        diagnostics: &mut Vec<LoadDiagnostic>,
    ) -> Option<PathBuf>;
}

/// Geometry of one primitive plus where it lands in the packed buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshDescriptor {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub transform_index: u32,
    pub base_color_texture: u32,
    pub normal_texture: u32,
    /// Byte offset into the packed vertex buffer.
    pub vertex_offset: u64,
    /// Byte offset into the packed index buffer.
    pub index_offset: u64,
}

impl MeshDescriptor {
    pub fn vertex_bytes(&self) -> u64 {
        self.vertices.len() as u64 * Vertex::STRIDE
    }

    pub fn index_bytes(&self) -> u64 {
        self.indices.len() as u64 * std::mem::size_of::<u32>() as u64
    }
}

/// Output of [`flatten`].
#[derive(Debug, Clone, Default)]
pub struct FlattenedScene {
    pub descriptors: Vec<MeshDescriptor>,
    pub transforms: Vec<Mat4>,
    pub textures: TextureRegistry,
    pub diagnostics: Vec<LoadDiagnostic>,
}

/// Walks `graph` breadth-first from its roots.
///
/// Each mesh-bearing node appends its world transform once; all of its
/// primitives share that transform index. Byte offsets are assigned in
/// traversal order with no gaps.
pub fn flatten<L: MeshLibrary + ?Sized>(graph: &SceneGraph, library: &L) -> FlattenedScene {
    let mut out = FlattenedScene::default();
    let mut visited = vec![false; graph.nodes.len()];
    let mut queue: VecDeque<(usize, Mat4)> =
        graph.roots.iter().map(|&r| (r, Mat4::IDENTITY)).collect();

    let mut vertex_offset = 0u64;
    let mut index_offset = 0u64;

    while let Some((index, parent_world)) = queue.pop_front() {
        let Some(node) = graph.node(index) else {
            log::warn!("scene references missing node {index}");
            continue;
        };
        if std::mem::replace(&mut visited[index], true) {
            out.diagnostics
                .push(LoadDiagnostic::NodeRevisited { node: index });
            continue;
        }

        let world = parent_world * node.local;

        if let Some(mesh) = node.mesh {
            let transform_index = out.transforms.len() as u32;
            out.transforms.push(world);

            for primitive in 0..library.primitive_count(mesh) {
                let location = PrimitiveLocation { mesh, primitive };
                let geometry = library.decode(location, &mut out.diagnostics);
                let base_color_texture = library
                    .base_color_texture(location, &mut out.diagnostics)
                    .map(|path| out.textures.resolve(path))
                    .unwrap_or(SENTINEL_TEXTURE);

                let descriptor = MeshDescriptor {
                    vertices: geometry.vertices,
                    indices: geometry.indices,
                    transform_index,
                    base_color_texture,
                    normal_texture: SENTINEL_TEXTURE,
                    vertex_offset,
                    index_offset,
                };
                vertex_offset += descriptor.vertex_bytes();
                index_offset += descriptor.index_bytes();
                out.descriptors.push(descriptor);
            }
        }

        queue.extend(node.children.iter().map(|&c| (c, world)));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    /// Meshes are given as lists of (vertex count, texture name) per primitive.
    struct FakeLibrary {
        meshes: Vec<Vec<(usize, Option<&'static str>)>>,
    }

    impl MeshLibrary for FakeLibrary {
        fn primitive_count(&self, mesh: usize) -> usize {
            self.meshes.get(mesh).map_or(0, Vec::len)
        }

        fn decode(&self, loc: PrimitiveLocation, _: &mut Vec<LoadDiagnostic>) -> PrimitiveGeometry {
            let (n, _) = self.meshes[loc.mesh][loc.primitive];
            PrimitiveGeometry {
                vertices: vec![Vertex::default(); n],
                indices: (0..n as u32).collect(),
            }
        }

        fn base_color_texture(
            &self,
            loc: PrimitiveLocation,
            diags: &mut Vec<LoadDiagnostic>,
        ) -> Option<PathBuf> {
            let tex = self.meshes[loc.mesh][loc.primitive].1;
            if tex.is_none() {
                diags.push(LoadDiagnostic::MissingBaseColorTexture { location: loc });
            }
            tex.map(PathBuf::from)
        }
    }

    fn translation(x: f32) -> Mat4 {
        Mat4::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn two_primitives_share_transform_and_texture() {
        let lib = FakeLibrary {
            meshes: vec![vec![(3, Some("a.png")), (6, Some("a.png"))]],
        };
        let mut g = SceneGraph::default();
        g.push_root(Mat4::IDENTITY, Some(0));

        let flat = flatten(&g, &lib);

        assert_eq!(flat.descriptors.len(), 2);
        assert_eq!(flat.transforms.len(), 1);
        assert_eq!(flat.textures.len(), 1);
        assert!(flat.descriptors.iter().all(|d| d.base_color_texture == 0));
        assert!(flat.descriptors.iter().all(|d| d.transform_index == 0));
    }

    #[test]
    fn offsets_are_sequential_bytes() {
        let lib = FakeLibrary {
            meshes: vec![vec![(3, None), (6, None)]],
        };
        let mut g = SceneGraph::default();
        g.push_root(Mat4::IDENTITY, Some(0));

        let flat = flatten(&g, &lib);
        let d = &flat.descriptors;

        assert_eq!((d[0].vertex_offset, d[0].index_offset), (0, 0));
        assert_eq!((d[1].vertex_offset, d[1].index_offset), (3 * 48, 3 * 4));
    }

    #[test]
    fn untextured_material_uses_sentinel_and_registers_nothing() {
        let lib = FakeLibrary {
            meshes: vec![vec![(3, None)]],
        };
        let mut g = SceneGraph::default();
        g.push_root(Mat4::IDENTITY, Some(0));

        let flat = flatten(&g, &lib);

        assert_eq!(flat.descriptors[0].base_color_texture, SENTINEL_TEXTURE);
        assert!(flat.textures.is_empty());
        assert_eq!(flat.diagnostics.len(), 1);
    }

    #[test]
    fn world_transform_composes_parent_then_local() {
        let lib = FakeLibrary {
            meshes: vec![vec![(3, None)]],
        };
        let mut g = SceneGraph::default();
        let root = g.push_root(translation(1.0), None);
        g.push_child(root, translation(2.0), Some(0));

        let flat = flatten(&g, &lib);

        assert_eq!(flat.transforms, vec![translation(3.0)]);
    }

    #[test]
    fn traversal_is_breadth_first() {
        // root -> [a -> [c], b]; every node carries mesh = its own index.
        let lib = FakeLibrary {
            meshes: vec![vec![(1, None)]; 4],
        };
        let mut g = SceneGraph::default();
        let root = g.push_root(Mat4::IDENTITY, Some(0));
        let a = g.push_child(root, translation(1.0), Some(1));
        g.push_child(root, translation(2.0), Some(2));
        g.push_child(a, translation(4.0), Some(3));

        let flat = flatten(&g, &lib);

        let xs: Vec<f32> = flat.transforms.iter().map(|m| m.w_axis.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 5.0]);
    }

    #[test]
    fn meshless_nodes_still_enqueue_children() {
        let lib = FakeLibrary {
            meshes: vec![vec![(3, None)]],
        };
        let mut g = SceneGraph::default();
        let root = g.push_root(Mat4::IDENTITY, None);
        let mid = g.push_child(root, Mat4::IDENTITY, None);
        g.push_child(mid, Mat4::IDENTITY, Some(0));

        assert_eq!(flatten(&g, &lib).descriptors.len(), 1);
    }

    #[test]
    fn shared_mesh_instances_each_emit_primitives() {
        let lib = FakeLibrary {
            meshes: vec![vec![(3, Some("t.png")), (3, Some("t.png"))]],
        };
        let mut g = SceneGraph::default();
        g.push_root(translation(-1.0), Some(0));
        g.push_root(translation(1.0), Some(0));

        let flat = flatten(&g, &lib);

        assert_eq!(flat.descriptors.len(), 4);
        assert_eq!(flat.transforms.len(), 2);
        assert_eq!(flat.textures.len(), 1);
    }

    #[test]
    fn revisited_node_is_reported_once_and_skipped() {
        let lib = FakeLibrary {
            meshes: vec![vec![(3, None)]],
        };
        let mut g = SceneGraph::default();
        let root = g.push_root(Mat4::IDENTITY, Some(0));
        g.nodes[root].children.push(root);

        let flat = flatten(&g, &lib);

        assert_eq!(flat.descriptors.len(), 1);
        assert!(flat
            .diagnostics
            .contains(&LoadDiagnostic::NodeRevisited { node: root }));
    }
}
