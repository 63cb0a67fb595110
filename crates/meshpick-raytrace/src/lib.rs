#![warn(missing_docs)]

//! CPU ray kernels and triangle BVH for mesh picking.
//!
//! # Architecture
//!
//! - [`Ray`] - Ray with a normalized direction and precomputed reciprocal
//! - [`intersect_triangle`] - Determinant-based ray/triangle test
//! - [`bvh`] - Median-split bounding volume hierarchy over a triangle list
//!
//! # Example
//!
//! ```
//! use meshpick_math::{Point3, Vec3};
//! use meshpick_raytrace::{Bvh, Ray};
//!
//! let positions = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let indices = vec![0, 1, 2];
//! let bvh = Bvh::build(&positions, &indices, 12);
//!
//! let ray = Ray::new(Point3::new(0.25, 0.25, -1.0), Vec3::new(0.0, 0.0, 1.0));
//! let (triangle, hit) = bvh.trace_closest(&ray, &positions, &indices).unwrap();
//! assert_eq!(triangle, 0);
//! assert!((hit.t - 1.0).abs() < 1e-6);
//! ```

pub mod bvh;
mod ray;
mod triangle;

pub use bvh::{Bvh, BvhNode, TraversalStats, DEFAULT_LEAF_SIZE, DEFAULT_STACK_CAPACITY};
pub use ray::Ray;
pub use triangle::{intersect_triangle, triangle_vertices, TriangleHit, DETERMINANT_EPSILON};
