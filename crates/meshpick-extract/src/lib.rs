#![warn(missing_docs)]

//! Triangle-soup extraction for the meshpick picking engine.
//!
//! Asset loaders expose each mesh as a list of primitive groups
//! ([`PrimitiveSource`]); [`extract_mesh`] merges the triangle-list groups
//! into one [`MeshGeometry`] with a single vertex buffer and rebased
//! indices. With the `gltf` feature, [`GltfPrimitive`] adapts glTF
//! primitives and [`load_gltf_scene`] walks a whole scene.
//!
//! # Example
//!
//! ```
//! use meshpick_extract::{extract_mesh, RawPrimitive};
//!
//! let prim = RawPrimitive::triangles(
//!     vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
//!     None,
//! );
//! let mesh = extract_mesh([prim]);
//! assert_eq!(mesh.num_triangles(), 1);
//! ```

pub mod error;
mod extract;
mod geometry;
#[cfg(feature = "gltf")]
mod gltf_loader;
mod source;

pub use error::{ExtractError, Result};
pub use extract::extract_mesh;
pub use geometry::MeshGeometry;
#[cfg(feature = "gltf")]
pub use gltf_loader::{
    extract_gltf_mesh, load_gltf_scene, scene_instances, GltfPrimitive, MeshInstance,
};
pub use source::{PositionLayout, PrimitiveSource, RawPrimitive, Topology};
