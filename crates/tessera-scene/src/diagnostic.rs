use std::fmt;
use std::path::PathBuf;

use crate::accessor::AccessorError;

/// Identifies one primitive inside a glTF document.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PrimitiveLocation {
    pub mesh: usize,
    pub primitive: usize,
}

impl fmt::Display for PrimitiveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh {} primitive {}", self.mesh, self.primitive)
    }
}

/// A non-fatal gap found while loading a scene.
///
/// Each one corresponds to a value that was replaced by zeros or by the
/// sentinel texture. They are collected during flattening and logged by the
/// caller.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadDiagnostic {
    /// Primitive has no POSITION attribute; it contributes zero vertices.
    MissingPositions { location: PrimitiveLocation },

    /// Primitive has no index accessor; sequential indices were generated.
    MissingIndices { location: PrimitiveLocation },

    /// An attribute or index accessor could not be read; its stream is empty.
    AccessorIssue {
        location: PrimitiveLocation,
        attribute: &'static str,
        error: AccessorError,
    },

    /// Primitive's material has no base-color texture; slot 0 is used.
    MissingBaseColorTexture { location: PrimitiveLocation },

    /// Base-color image has neither a URI nor a name to build a path from.
    UnresolvableImage {
        location: PrimitiveLocation,
        image: usize,
    },

    /// Image path resolved but the file could not be loaded.
    ImageLoadFailed { path: PathBuf, reason: String },

    /// Primitive has indices but no readable vertices; the indices were dropped.
    IndicesWithoutVertices {
        location: PrimitiveLocation,
        dropped: usize,
    },

    /// Primitive is not a triangle list; it is still drawn as one.
    NonTriangleTopology { location: PrimitiveLocation },

    /// Node was reached twice during traversal; the second visit was skipped.
    NodeRevisited { node: usize },
}

impl fmt::Display for LoadDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPositions { location } => {
                write!(f, "{location}: no POSITION attribute")
            }
            Self::MissingIndices { location } => {
                write!(f, "{location}: no indices, generated a sequential list")
            }
            Self::AccessorIssue {
                location,
                attribute,
                error,
            } => write!(f, "{location}: {attribute} unreadable ({error})"),
            Self::MissingBaseColorTexture { location } => {
                write!(f, "{location}: no base color texture, using slot 0")
            }
            Self::UnresolvableImage { location, image } => {
                write!(f, "{location}: image {image} has no uri or name")
            }
            Self::IndicesWithoutVertices { location, dropped } => {
                write!(f, "{location}: dropped {dropped} indices with no vertices to address")
            }
            Self::ImageLoadFailed { path, reason } => {
                write!(f, "image {} failed to load: {reason}", path.display())
            }
            Self::NonTriangleTopology { location } => {
                write!(f, "{location}: not a triangle list, drawn as triangles")
            }
            Self::NodeRevisited { node } => write!(f, "node {node} visited twice, skipped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_primitive() {
        let d = LoadDiagnostic::MissingIndices {
            location: PrimitiveLocation { mesh: 2, primitive: 1 },
        };
        assert_eq!(d.to_string(), "mesh 2 primitive 1: no indices, generated a sequential list");
    }

    #[test]
    fn accessor_issue_includes_error_text() {
        let d = LoadDiagnostic::AccessorIssue {
            location: PrimitiveLocation { mesh: 0, primitive: 0 },
            attribute: "indices",
            error: AccessorError::UnsupportedComponentType { accessor: 2 },
        };
        let text = d.to_string();
        assert!(text.contains("indices"));
        assert!(text.contains("accessor 2"));
    }
}
