//! Ray representation and the ray/box slab test.

use meshpick_math::{Aabb3, Dir3, Point3, Transform, Vec3};

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized. A zero direction yields NaN
    /// components, and such a ray never intersects anything.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        // Adding +0 turns -0 into +0, so a zero component's reciprocal is +inf.
        let dir = Dir3::new_normalize(direction + Vec3::zeros());
        let inv = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        Self {
            origin,
            direction: dir,
            inv_direction: inv,
        }
    }

    /// Reciprocal of each direction component.
    #[inline]
    pub fn inv_direction(&self) -> &Vec3 {
        &self.inv_direction
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }

    /// Map this ray through `world_to_local` and renormalize.
    ///
    /// Also returns how many local units one world unit along this ray
    /// spans, so a world-space distance `d` corresponds to the local
    /// parameter `d * scale`. The factor is 1 for rigid transforms.
    pub fn to_local(&self, world_to_local: &Transform) -> (Ray, f32) {
        let origin = world_to_local.apply_point(&self.origin);
        let direction = world_to_local.apply_vec(self.direction.as_ref());
        let scale = direction.norm();
        (Ray::new(origin, direction), scale)
    }

    /// Slab test against `aabb` over the parameter interval `[0, t_max]`.
    ///
    /// Returns false as soon as the interval becomes empty, which covers
    /// boxes behind the origin and boxes entirely beyond `t_max`.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3, t_max: f32) -> bool {
        let mut t_near = 0.0_f32;
        let mut t_far = t_max;

        for axis in 0..3 {
            let o = self.origin[axis];
            let inv = self.inv_direction[axis];
            let mut t0 = (aabb.min[axis] - o) * inv;
            let mut t1 = (aabb.max[axis] - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            // f32::max/min drop a NaN operand (origin on a slab plane of a
            // zero direction component), leaving the interval unchanged.
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_far < t_near {
                return false;
            }
        }

        true
    }
}
