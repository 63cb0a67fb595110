//! Ray/triangle intersection.

use meshpick_math::Point3;

use crate::Ray;

/// Determinant magnitude below which a triangle is treated as degenerate
/// (or parallel to the ray) and never hit.
pub const DETERMINANT_EPSILON: f32 = 1e-8;

/// Result of a ray/triangle test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Parameter along the ray, always > 0.
    pub t: f32,
    /// Barycentric weight of the second vertex.
    pub u: f32,
    /// Barycentric weight of the third vertex.
    pub v: f32,
}

impl TriangleHit {
    /// Weight of the first vertex, `1 - u - v`.
    pub fn w(&self) -> f32 {
        1.0 - self.u - self.v
    }
}

/// Fetch the three vertices of triangle `triangle` from indexed buffers.
///
/// Indices must be in range for `positions`.
#[inline]
pub fn triangle_vertices(positions: &[Point3], indices: &[u32], triangle: u32) -> [Point3; 3] {
    let base = triangle as usize * 3;
    [
        positions[indices[base] as usize],
        positions[indices[base + 1] as usize],
        positions[indices[base + 2] as usize],
    ]
}

/// Möller–Trumbore test along the positive ray direction.
///
/// Hits at `t <= 0` (at or behind the origin) are rejected, as are
/// triangles whose determinant is below [`DETERMINANT_EPSILON`].
/// Both faces of the triangle can be hit.
#[inline]
pub fn intersect_triangle(ray: &Ray, v0: &Point3, v1: &Point3, v2: &Point3) -> Option<TriangleHit> {
    let d = ray.direction.as_ref();
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = d.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < DETERMINANT_EPSILON || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;

    let tv = ray.origin - v0;
    let u = tv.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = tv.cross(&e1);
    let v = d.dot(&q) * inv_det;
    if !(v >= 0.0 && u + v <= 1.0) {
        return None;
    }

    let t = e2.dot(&q) * inv_det;
    if t.is_nan() || t <= 0.0 {
        return None;
    }

    Some(TriangleHit { t, u, v })
}
