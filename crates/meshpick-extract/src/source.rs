//! Abstraction over asset mesh primitives.

/// Primitive topology as declared by the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Point list.
    Points,
    /// Line list.
    Lines,
    /// Closed line strip.
    LineLoop,
    /// Line strip.
    LineStrip,
    /// Triangle list. The only topology that is extracted.
    Triangles,
    /// Triangle strip.
    TriangleStrip,
    /// Triangle fan.
    TriangleFan,
}

/// Shape of a primitive's position attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionLayout {
    /// Number of vertices.
    pub count: usize,
    /// Components per vertex (1 to 4; missing Y/Z read as 0, W ignored).
    pub components: usize,
}

/// One primitive group of a mesh, as exposed by an asset loader.
pub trait PrimitiveSource {
    /// Declared topology.
    fn topology(&self) -> Topology;

    /// Position attribute layout, or `None` if the primitive has no positions.
    fn position_layout(&self) -> Option<PositionLayout>;

    /// Bulk-unpack positions into `out` (`count * components` floats).
    ///
    /// Returns the number of floats written; fewer than requested means
    /// the bulk path failed and positions are re-read one by one.
    fn unpack_positions(&self, out: &mut [f32]) -> usize;

    /// Read the vertex at `index` into `out` (`components` floats).
    ///
    /// Returns false if the element cannot be read.
    fn read_position(&self, index: usize, out: &mut [f32]) -> bool;

    /// Number of explicit indices; 0 means the primitive is not indexed.
    fn index_count(&self) -> usize;

    /// Read the explicit index at slot `i`.
    fn read_index(&self, i: usize) -> u32;
}

impl<T: PrimitiveSource + ?Sized> PrimitiveSource for &T {
    fn topology(&self) -> Topology {
        (**self).topology()
    }

    fn position_layout(&self) -> Option<PositionLayout> {
        (**self).position_layout()
    }

    fn unpack_positions(&self, out: &mut [f32]) -> usize {
        (**self).unpack_positions(out)
    }

    fn read_position(&self, index: usize, out: &mut [f32]) -> bool {
        (**self).read_position(index, out)
    }

    fn index_count(&self) -> usize {
        (**self).index_count()
    }

    fn read_index(&self, i: usize) -> u32 {
        (**self).read_index(i)
    }
}

/// A primitive backed by in-memory buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPrimitive {
    /// Declared topology.
    pub topology: Topology,
    /// Components per position.
    pub components: usize,
    /// Interleaved position components, or `None` for a primitive without positions.
    pub positions: Option<Vec<f32>>,
    /// Explicit indices, if any.
    pub indices: Option<Vec<u32>>,
}

impl RawPrimitive {
    /// Indexed triangle list with 3-component positions.
    pub fn triangles(positions: Vec<f32>, indices: Option<Vec<u32>>) -> Self {
        Self {
            topology: Topology::Triangles,
            components: 3,
            positions: Some(positions),
            indices,
        }
    }
}

impl PrimitiveSource for RawPrimitive {
    fn topology(&self) -> Topology {
        self.topology
    }

    fn position_layout(&self) -> Option<PositionLayout> {
        let positions = self.positions.as_ref()?;
        Some(PositionLayout {
            count: positions.len() / self.components.max(1),
            components: self.components,
        })
    }

    fn unpack_positions(&self, out: &mut [f32]) -> usize {
        let src = self.positions.as_deref().unwrap_or_default();
        let n = src.len().min(out.len());
        out[..n].copy_from_slice(&src[..n]);
        n
    }

    fn read_position(&self, index: usize, out: &mut [f32]) -> bool {
        let src = self.positions.as_deref().unwrap_or_default();
        let start = index * self.components;
        match src.get(start..start + out.len()) {
            Some(element) => {
                out.copy_from_slice(element);
                true
            }
            None => false,
        }
    }

    fn index_count(&self) -> usize {
        self.indices.as_ref().map_or(0, Vec::len)
    }

    fn read_index(&self, i: usize) -> u32 {
        self.indices.as_ref().map_or(0, |indices| indices[i])
    }
}
