//! Error types for picking queries and settings.

use thiserror::Error;

use crate::entity::EntityId;

/// Errors that can occur while configuring or querying a [`crate::PickingRegistry`].
///
/// A ray that hits nothing is not an error; it yields [`crate::Hit::none`].
#[derive(Error, Debug)]
pub enum PickError {
    /// A vector argument did not have exactly three components.
    #[error("{name} must have exactly 3 components, got {len}")]
    InvalidVector {
        /// Argument name.
        name: &'static str,
        /// Number of components received.
        len: usize,
    },

    /// The viewport has no area.
    #[error("viewport is empty ({width}x{height})")]
    EmptyViewport {
        /// Viewport width in pixels.
        width: i32,
        /// Viewport height in pixels.
        height: i32,
    },

    /// A camera matrix could not be inverted.
    #[error("{0} matrix is not invertible")]
    SingularMatrix(&'static str),

    /// A read-only pick reached an entity whose BVH has not been built.
    #[error("BVH for entity {0} has not been built")]
    BvhNotBuilt(EntityId),

    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings file could not be parsed.
    #[error("could not parse settings: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error while reading settings.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for picking operations.
pub type Result<T> = std::result::Result<T, PickError>;
