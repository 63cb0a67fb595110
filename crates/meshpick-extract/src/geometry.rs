//! Merged triangle geometry.

use meshpick_math::{Aabb3, Point3};

use crate::error::{ExtractError, Result};

/// A flattened triangle soup in local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    /// Vertex positions.
    pub positions: Vec<Point3>,
    /// Triangle list, three indices per triangle, each `< positions.len()`.
    pub indices: Vec<u32>,
    /// Local bounds; `None` until filled by registration or [`Self::ensure_bounds`].
    pub local_bounds: Option<Aabb3>,
}

impl MeshGeometry {
    /// Create geometry with unset bounds.
    pub fn new(positions: Vec<Point3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            local_bounds: None,
        }
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Union of all vertex positions. Empty for a mesh without vertices.
    pub fn compute_bounds(&self) -> Aabb3 {
        Aabb3::from_points(&self.positions)
    }

    /// Fill [`Self::local_bounds`] if unset and return it.
    pub fn ensure_bounds(&mut self) -> Aabb3 {
        *self.local_bounds.get_or_insert_with(|| Aabb3::from_points(&self.positions))
    }

    /// Check that every index references an existing vertex.
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.positions.len();
        match self
            .indices
            .iter()
            .position(|&i| i as usize >= vertex_count)
        {
            Some(slot) => Err(ExtractError::IndexOutOfRange {
                triangle: slot / 3,
                index: self.indices[slot],
                vertex_count,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> MeshGeometry {
        MeshGeometry::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_counts() {
        let mesh = unit_triangle();
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.num_vertices(), 3);
        assert!(mesh.local_bounds.is_none());
    }

    #[test]
    fn test_ensure_bounds_fills_once() {
        let mut mesh = unit_triangle();
        let bounds = mesh.ensure_bounds();
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 0.0));

        // An explicit bound is kept as-is.
        let preset = Aabb3::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(2.0, 2.0, 2.0));
        mesh.local_bounds = Some(preset);
        assert_eq!(mesh.ensure_bounds(), preset);
    }

    #[test]
    fn test_validate() {
        let mut mesh = unit_triangle();
        assert!(mesh.validate().is_ok());
        mesh.indices.extend_from_slice(&[0, 1, 7]);
        match mesh.validate() {
            Err(ExtractError::IndexOutOfRange {
                triangle,
                index,
                vertex_count,
            }) => {
                assert_eq!(triangle, 1);
                assert_eq!(index, 7);
                assert_eq!(vertex_count, 3);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
