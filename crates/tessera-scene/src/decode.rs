//! Per-primitive geometry decoding into the shared [`Vertex`] schema.

use gltf::mesh::Mode;
use gltf::Semantic;

use crate::accessor::{AccessorError, AccessorView};
use crate::diagnostic::{LoadDiagnostic, PrimitiveLocation};
use crate::vertex::Vertex;

/// Decoded vertex and index streams of one primitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimitiveGeometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

type Stream<'a> = Option<Result<AccessorView<'a>, AccessorError>>;

/// The accessors a primitive exposes, already resolved against buffer data.
///
/// `None` means the attribute is absent; `Some(Err(_))` means it is present
/// but unreadable.
#[derive(Debug, Default)]
pub struct PrimitiveStreams<'a> {
    pub positions: Stream<'a>,
    pub normals: Stream<'a>,
    pub texcoords: Stream<'a>,
    pub tangents: Stream<'a>,
    pub indices: Stream<'a>,
}

impl<'a> PrimitiveStreams<'a> {
    pub fn from_gltf(
        primitive: &gltf::Primitive<'_>,
        root: &gltf::json::Root,
        buffers: &'a [gltf::buffer::Data],
    ) -> Self {
        let resolve = |semantic: Semantic| {
            primitive
                .get(&semantic)
                .map(|a| AccessorView::from_gltf(&a, root, buffers))
        };

        Self {
            positions: resolve(Semantic::Positions),
            normals: resolve(Semantic::Normals),
            texcoords: resolve(Semantic::TexCoords(0)),
            tangents: resolve(Semantic::Tangents),
            indices: primitive
                .indices()
                .map(|a| AccessorView::from_gltf(&a, root, buffers)),
        }
    }
}

/// Decodes a glTF primitive, pushing any gaps onto `diagnostics`.
pub fn decode_primitive(
    primitive: &gltf::Primitive<'_>,
    root: &gltf::json::Root,
    buffers: &[gltf::buffer::Data],
    location: PrimitiveLocation,
    diagnostics: &mut Vec<LoadDiagnostic>,
) -> PrimitiveGeometry {
    if primitive.mode() != Mode::Triangles {
        diagnostics.push(LoadDiagnostic::NonTriangleTopology { location });
    }
    let streams = PrimitiveStreams::from_gltf(primitive, root, buffers);
    decode_streams(&streams, location, diagnostics)
}

/// Builds vertices and indices from resolved streams.
///
/// The vertex count is taken from POSITION. Other attributes fill the leading
/// vertices they cover and leave the rest zeroed. A primitive without vertices
/// keeps no indices either.
pub fn decode_streams(
    streams: &PrimitiveStreams<'_>,
    location: PrimitiveLocation,
    diagnostics: &mut Vec<LoadDiagnostic>,
) -> PrimitiveGeometry {
    let positions: Vec<[f32; 3]> = match &streams.positions {
        None => {
            diagnostics.push(LoadDiagnostic::MissingPositions { location });
            Vec::new()
        }
        some => read_attribute(some, "POSITION", location, diagnostics),
    };

    let mut vertices: Vec<Vertex> = positions
        .into_iter()
        .map(|position| Vertex {
            position,
            ..Vertex::default()
        })
        .collect();

    let normals: Vec<[f32; 3]> = read_attribute(&streams.normals, "NORMAL", location, diagnostics);
    for (v, n) in vertices.iter_mut().zip(normals) {
        v.normal = n;
    }

    let uvs: Vec<[f32; 2]> =
        read_attribute(&streams.texcoords, "TEXCOORD_0", location, diagnostics);
    for (v, uv) in vertices.iter_mut().zip(uvs) {
        v.uv = uv;
    }

    let tangents: Vec<[f32; 4]> =
        read_attribute(&streams.tangents, "TANGENT", location, diagnostics);
    for (v, t) in vertices.iter_mut().zip(tangents) {
        v.tangent = t;
    }

    let mut indices: Vec<u32> = match &streams.indices {
        None => {
            diagnostics.push(LoadDiagnostic::MissingIndices { location });
            (0..vertices.len() as u32).collect()
        }
        Some(Err(error)) => {
            diagnostics.push(LoadDiagnostic::AccessorIssue {
                location,
                attribute: "indices",
                error: error.clone(),
            });
            Vec::new()
        }
        Some(Ok(view)) => match view.read_indices() {
            Ok(iter) => iter.collect(),
            Err(error) => {
                diagnostics.push(LoadDiagnostic::AccessorIssue {
                    location,
                    attribute: "indices",
                    error,
                });
                Vec::new()
            }
        },
    };

    // Indices into an empty vertex block would address the next primitive's vertices.
    if vertices.is_empty() && !indices.is_empty() {
        diagnostics.push(LoadDiagnostic::IndicesWithoutVertices {
            location,
            dropped: indices.len(),
        });
        indices.clear();
    }

    PrimitiveGeometry { vertices, indices }
}

fn read_attribute<const N: usize>(
    stream: &Stream<'_>,
    attribute: &'static str,
    location: PrimitiveLocation,
    diagnostics: &mut Vec<LoadDiagnostic>,
) -> Vec<[f32; N]> {
    let result = match stream {
        None => return Vec::new(),
        Some(Err(error)) => Err(error.clone()),
        Some(Ok(view)) => view.read_f32::<N>().map(|iter| iter.collect()),
    };

    result.unwrap_or_else(|error| {
        diagnostics.push(LoadDiagnostic::AccessorIssue {
            location,
            attribute,
            error,
        });
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::ComponentType;

    const LOC: PrimitiveLocation = PrimitiveLocation { mesh: 0, primitive: 0 };

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn view(data: &[u8], component: ComponentType, components: usize, count: usize) -> Stream<'_> {
        Some(AccessorView::new(data, 0, None, count, component, components))
    }

    #[test]
    fn positions_only_leaves_other_fields_zero() {
        let pos = f32_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let idx: Vec<u8> = [0u16, 1, 2].iter().flat_map(|v| v.to_le_bytes()).collect();
        let streams = PrimitiveStreams {
            positions: view(&pos, ComponentType::F32, 3, 3),
            indices: view(&idx, ComponentType::U16, 1, 3),
            ..Default::default()
        };

        let mut diags = Vec::new();
        let geom = decode_streams(&streams, LOC, &mut diags);

        assert!(diags.is_empty());
        assert_eq!(geom.vertices.len(), 3);
        assert_eq!(geom.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(geom.vertices[1].normal, [0.0; 3]);
        assert_eq!(geom.vertices[1].uv, [0.0; 2]);
        assert_eq!(geom.vertices[1].tangent, [0.0; 4]);
        assert_eq!(geom.indices, vec![0, 1, 2]);
    }

    #[test]
    fn all_attributes_are_copied() {
        let pos = f32_bytes(&[1.0, 2.0, 3.0]);
        let nrm = f32_bytes(&[0.0, 1.0, 0.0]);
        let uv = f32_bytes(&[0.25, 0.75]);
        let tan = f32_bytes(&[1.0, 0.0, 0.0, -1.0]);
        let idx = [0u8];
        let streams = PrimitiveStreams {
            positions: view(&pos, ComponentType::F32, 3, 1),
            normals: view(&nrm, ComponentType::F32, 3, 1),
            texcoords: view(&uv, ComponentType::F32, 2, 1),
            tangents: view(&tan, ComponentType::F32, 4, 1),
            indices: view(&idx, ComponentType::U8, 1, 1),
        };

        let mut diags = Vec::new();
        let geom = decode_streams(&streams, LOC, &mut diags);

        assert!(diags.is_empty());
        assert_eq!(
            geom.vertices[0],
            Vertex {
                position: [1.0, 2.0, 3.0],
                normal: [0.0, 1.0, 0.0],
                uv: [0.25, 0.75],
                tangent: [1.0, 0.0, 0.0, -1.0],
            }
        );
    }

    #[test]
    fn missing_indices_generate_sequence_and_diagnostic() {
        let pos = f32_bytes(&[0.0; 9]);
        let streams = PrimitiveStreams {
            positions: view(&pos, ComponentType::F32, 3, 3),
            ..Default::default()
        };

        let mut diags = Vec::new();
        let geom = decode_streams(&streams, LOC, &mut diags);

        assert_eq!(geom.indices, vec![0, 1, 2]);
        assert_eq!(diags, vec![LoadDiagnostic::MissingIndices { location: LOC }]);
    }

    #[test]
    fn unsupported_index_type_yields_empty_stream_and_diagnostic() {
        let pos = f32_bytes(&[0.0; 9]);
        let streams = PrimitiveStreams {
            positions: view(&pos, ComponentType::F32, 3, 3),
            indices: Some(Err(AccessorError::UnsupportedComponentType { accessor: 1 })),
            ..Default::default()
        };

        let mut diags = Vec::new();
        let geom = decode_streams(&streams, LOC, &mut diags);

        assert_eq!(geom.vertices.len(), 3);
        assert!(geom.indices.is_empty());
        assert!(matches!(
            diags.as_slice(),
            [LoadDiagnostic::AccessorIssue { attribute: "indices", .. }]
        ));
    }

    #[test]
    fn missing_positions_gives_no_vertices() {
        let mut diags = Vec::new();
        let geom = decode_streams(&PrimitiveStreams::default(), LOC, &mut diags);

        assert!(geom.vertices.is_empty());
        assert!(geom.indices.is_empty());
        assert_eq!(diags[0], LoadDiagnostic::MissingPositions { location: LOC });
    }

    #[test]
    fn unreadable_positions_drop_their_indices() {
        let idx = [0u8, 1, 2];
        let streams = PrimitiveStreams {
            positions: Some(Err(AccessorError::MissingView { accessor: 0 })),
            indices: view(&idx, ComponentType::U8, 1, 3),
            ..Default::default()
        };

        let mut diags = Vec::new();
        let geom = decode_streams(&streams, LOC, &mut diags);

        assert!(geom.vertices.is_empty());
        assert!(geom.indices.is_empty());
        assert!(diags.contains(&LoadDiagnostic::IndicesWithoutVertices {
            location: LOC,
            dropped: 3,
        }));
    }

    #[test]
    fn short_normal_stream_fills_leading_vertices_only() {
        let pos = f32_bytes(&[0.0; 6]);
        let nrm = f32_bytes(&[0.0, 0.0, 1.0]);
        let idx = [0u8, 1];
        let streams = PrimitiveStreams {
            positions: view(&pos, ComponentType::F32, 3, 2),
            normals: view(&nrm, ComponentType::F32, 3, 1),
            indices: view(&idx, ComponentType::U8, 1, 2),
            ..Default::default()
        };

        let mut diags = Vec::new();
        let geom = decode_streams(&streams, LOC, &mut diags);

        assert_eq!(geom.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(geom.vertices[1].normal, [0.0; 3]);
    }
}
