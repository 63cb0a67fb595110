//! Pick results.

use meshpick_math::{Point3, Vec3};
use meshpick_raytrace::{TraversalStats, TriangleHit};
use serde::Serialize;

use crate::entity::EntityId;

/// Closest intersection reported by a pick.
///
/// A miss is encoded structurally: `entity` is [`EntityId::NONE`] and
/// `triangle` is -1. Check [`Hit::is_hit`] (or use [`Hit::into_option`])
/// before reading the other fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hit {
    /// Entity that was hit.
    pub entity: EntityId,
    /// Triangle ordinal within the entity's geometry, or -1.
    pub triangle: i32,
    /// Distance along the normalized world-space ray; `+inf` on a miss.
    pub distance: f32,
    /// Barycentric weights `(u, v, w)` with `w = 1 - u - v`.
    ///
    /// `u` weighs the triangle's second vertex, `v` its third and `w` its first.
    #[serde(serialize_with = "serialize_vec3")]
    pub barycentric: Vec3,
}

impl Hit {
    /// The empty result: no entity, no triangle, unbounded distance.
    pub fn none() -> Self {
        Self {
            entity: EntityId::NONE,
            triangle: -1,
            distance: f32::INFINITY,
            barycentric: Vec3::zeros(),
        }
    }

    pub(crate) fn from_triangle(entity: EntityId, triangle: u32, distance: f32, hit: &TriangleHit) -> Self {
        Self {
            entity,
            triangle: triangle as i32,
            distance,
            barycentric: Vec3::new(hit.u, hit.v, hit.w()),
        }
    }

    /// True if this result names an intersected triangle.
    pub fn is_hit(&self) -> bool {
        !self.entity.is_none() && self.triangle >= 0
    }

    /// `Some(self)` for a hit, `None` for the empty result.
    pub fn into_option(self) -> Option<Self> {
        self.is_hit().then_some(self)
    }

    /// World-space hit point on a ray with the given origin and unit direction.
    pub fn point(&self, origin: &Point3, direction: &Vec3) -> Option<Point3> {
        self.is_hit().then(|| origin + direction * self.distance)
    }
}

impl Default for Hit {
    fn default() -> Self {
        Self::none()
    }
}

fn serialize_vec3<S: serde::Serializer>(v: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
    [v.x, v.y, v.z].serialize(serializer)
}

/// Counters gathered during one pick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PickStats {
    /// Entities whose local bounds passed the broad phase.
    pub entities_tested: usize,
    /// Entities rejected by the broad phase.
    pub entities_culled: usize,
    /// Entities skipped because their world transform is singular.
    pub entities_skipped: usize,
    /// BVH nodes popped from the traversal stack.
    pub nodes_visited: usize,
    /// Ray/triangle tests performed.
    pub triangles_tested: usize,
}

impl PickStats {
    pub(crate) fn add_traversal(&mut self, traversal: &TraversalStats) {
        self.nodes_visited += traversal.nodes_visited;
        self.triangles_tested += traversal.triangles_tested;
    }
}
