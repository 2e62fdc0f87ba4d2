//! Typed, bounds-checked views over glTF buffer data.
//!
//! An [`AccessorView`] is a byte range plus element stride plus component type.
//! All bounds are validated once at construction, so the iterators it hands
//! out never index past the underlying buffer.

/// Numeric component type of an accessor, as encoded by glTF (GL enum values).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    /// Maps a GL component enum to a known type.
    ///
    /// Returns `None` for codes glTF does not allow in accessors (e.g. `GL_INT`).
    pub fn from_gl(code: u32) -> Option<Self> {
        match code {
            5120 => Some(Self::I8),
            5121 => Some(Self::U8),
            5122 => Some(Self::I16),
            5123 => Some(Self::U16),
            5125 => Some(Self::U32),
            5126 => Some(Self::F32),
            _ => None,
        }
    }

    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }
}

/// Reasons an accessor could not be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessorError {
    #[error("accessor {accessor} has no buffer view")]
    MissingView { accessor: usize },

    #[error("accessor {accessor} is sparse")]
    Sparse { accessor: usize },

    #[error("buffer {buffer} is not loaded")]
    MissingBuffer { buffer: usize },

    #[error("accessor {accessor} has an unrecognized component type")]
    UnsupportedComponentType { accessor: usize },

    #[error("expected {expected}, found {components} x {component:?}")]
    UnexpectedFormat {
        expected: &'static str,
        components: usize,
        component: ComponentType,
    },

    #[error("stride {stride} is smaller than element size {element}")]
    StrideTooSmall { stride: usize, element: usize },

    #[error("accessor reads up to byte {end} but only {len} bytes are available")]
    OutOfBounds { end: usize, len: usize },
}

/// Validated view of `count` elements inside a byte slice.
#[derive(Debug, Copy, Clone)]
pub struct AccessorView<'a> {
    data: &'a [u8],
    offset: usize,
    stride: usize,
    count: usize,
    component: ComponentType,
    components: usize,
}

impl<'a> AccessorView<'a> {
    /// Creates a view over `data`.
    ///
    /// `stride` defaults to the tightly packed element size when `None`.
    pub fn new(
        data: &'a [u8],
        offset: usize,
        stride: Option<usize>,
        count: usize,
        component: ComponentType,
        components: usize,
    ) -> Result<Self, AccessorError> {
        let element = component.size() * components;
        let stride = stride.unwrap_or(element);
        if stride < element {
            return Err(AccessorError::StrideTooSmall { stride, element });
        }

        if count > 0 {
            let end = (count - 1)
                .checked_mul(stride)
                .and_then(|v| v.checked_add(offset))
                .and_then(|v| v.checked_add(element))
                .unwrap_or(usize::MAX);
            if end > data.len() {
                return Err(AccessorError::OutOfBounds { end, len: data.len() });
            }
        }

        Ok(Self {
            data,
            offset,
            stride,
            count,
            component,
            components,
        })
    }

    /// Resolves a glTF accessor against loaded buffer data.
    ///
    /// `root` is the document JSON; the component type is read from it so an
    /// unrecognized type becomes an error instead of a panic.
    ///
    /// The view is clamped to its buffer view's byte range, so an accessor that
    /// overruns its view is rejected even if the buffer itself is large enough.
    pub fn from_gltf(
        accessor: &gltf::Accessor<'_>,
        root: &gltf::json::Root,
        buffers: &'a [gltf::buffer::Data],
    ) -> Result<Self, AccessorError> {
        let component = component_type(root, accessor.index())?;

        if accessor.sparse().is_some() {
            return Err(AccessorError::Sparse {
                accessor: accessor.index(),
            });
        }

        let view = accessor.view().ok_or(AccessorError::MissingView {
            accessor: accessor.index(),
        })?;

        let buffer_index = view.buffer().index();
        let buffer = buffers
            .get(buffer_index)
            .ok_or(AccessorError::MissingBuffer {
                buffer: buffer_index,
            })?;

        let view_bytes = &buffer[view_range(view.offset(), view.length(), buffer.len())?];

        Self::new(
            view_bytes,
            accessor.offset(),
            view.stride(),
            accessor.count(),
            component,
            accessor.dimensions().multiplicity(),
        )
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn component(&self) -> ComponentType {
        self.component
    }

    pub fn components(&self) -> usize {
        self.components
    }

    fn element(&self, i: usize) -> &'a [u8] {
        let start = self.offset + i * self.stride;
        &self.data[start..start + self.component.size() * self.components]
    }

    /// Reads `N`-component float vectors.
    pub fn read_f32<const N: usize>(
        &self,
    ) -> Result<impl Iterator<Item = [f32; N]> + 'a, AccessorError> {
        if self.component != ComponentType::F32 || self.components != N {
            return Err(AccessorError::UnexpectedFormat {
                expected: match N {
                    2 => "2 x F32",
                    3 => "3 x F32",
                    4 => "4 x F32",
                    _ => "F32 vector",
                },
                components: self.components,
                component: self.component,
            });
        }

        let view = *self;
        Ok((0..view.count).map(move |i| {
            let bytes = view.element(i);
            std::array::from_fn(|c| {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&bytes[c * 4..c * 4 + 4]);
                f32::from_le_bytes(raw)
            })
        }))
    }

    /// Reads scalar indices, widening every source width to `u32`.
    ///
    /// Values keep their original order and are not rebased. Float indices are
    /// converted by value.
    pub fn read_indices(&self) -> Result<impl Iterator<Item = u32> + 'a, AccessorError> {
        if self.components != 1 {
            return Err(AccessorError::UnexpectedFormat {
                expected: "scalar index",
                components: self.components,
                component: self.component,
            });
        }

        let view = *self;
        Ok((0..view.count).map(move |i| {
            let b = view.element(i);
            match view.component {
                ComponentType::I8 | ComponentType::U8 => b[0] as u32,
                ComponentType::I16 | ComponentType::U16 => u16::from_le_bytes([b[0], b[1]]) as u32,
                ComponentType::U32 => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
                ComponentType::F32 => f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as u32,
            }
        }))
    }
}

/// Component type of accessor `index`, as written in the document.
pub fn component_type(
    root: &gltf::json::Root,
    index: usize,
) -> Result<ComponentType, AccessorError> {
    use gltf::json::validation::Checked;

    match root.accessors.get(index).map(|a| &a.component_type) {
        Some(Checked::Valid(generic)) => ComponentType::from_gl(generic.0.as_gl_enum())
            .ok_or(AccessorError::UnsupportedComponentType { accessor: index }),
        _ => Err(AccessorError::UnsupportedComponentType { accessor: index }),
    }
}

/// Byte range of a buffer view, checked against the buffer length.
fn view_range(
    offset: usize,
    length: usize,
    buffer_len: usize,
) -> Result<std::ops::Range<usize>, AccessorError> {
    match offset.checked_add(length) {
        Some(end) if end <= buffer_len => Ok(offset..end),
        Some(end) => Err(AccessorError::OutOfBounds { end, len: buffer_len }),
        None => Err(AccessorError::OutOfBounds {
            end: usize::MAX,
            len: buffer_len,
        }),
    }
}
