#![warn(missing_docs)]

//! CPU ray picking against many independently transformed triangle meshes.
//!
//! Meshes are registered per entity in a [`PickingRegistry`] together with
//! a world transform. A pick maps the world-space ray into each entity's
//! local space, rejects entities by their local bounds, builds a BVH on
//! first use and returns the single closest [`Hit`] across all entities.
//!
//! # Example
//!
//! ```
//! use meshpick::{EntityId, MeshGeometry, PickingRegistry};
//! use meshpick::meshpick_math::{Point3, Transform, Vec3};
//!
//! let triangle = MeshGeometry::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![0, 1, 2],
//! );
//!
//! let mut registry = PickingRegistry::new();
//! registry.register_mesh(EntityId(7), triangle);
//! registry.set_world_transform(EntityId(7), Transform::translation(10.0, 0.0, 0.0));
//!
//! let hit = registry.pick(Point3::new(10.25, 0.25, -1.0), Vec3::new(0.0, 0.0, 1.0));
//! assert_eq!(hit.entity, EntityId(7));
//! assert_eq!(hit.triangle, 0);
//! ```

pub use meshpick_extract;
pub use meshpick_math;
pub use meshpick_raytrace;

mod entity;
pub mod error;
mod hit;
mod registry;
mod screen;
mod settings;

pub use entity::EntityId;
pub use error::{PickError, Result};
pub use hit::{Hit, PickStats};
pub use meshpick_extract::{extract_mesh, MeshGeometry};
pub use registry::{MeshRecord, PickingRegistry};
pub use screen::{screen_ray, CameraMatrices, Viewport};
pub use settings::PickSettings;
