//! Error types for mesh extraction and loading.

use thiserror::Error;

/// Errors that can occur while loading or checking mesh geometry.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The glTF file could not be read or parsed.
    #[cfg(feature = "gltf")]
    #[error("glTF import failed: {0}")]
    Gltf(#[from] gltf::Error),

    /// The document has no scene to walk.
    #[error("document has no scene")]
    NoScene,

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        /// Triangle ordinal.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractError>;
