//! Registry configuration.

use std::path::Path;

use meshpick_raytrace::{DEFAULT_LEAF_SIZE, DEFAULT_STACK_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::error::{PickError, Result};

/// Tunables for BVH construction and traversal.
///
/// Every key is optional in TOML; missing keys take their defaults.
///
/// ```toml
/// leaf_size = 8
/// traversal_stack_capacity = 64
/// eager_build = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PickSettings {
    /// Maximum triangles per BVH leaf.
    pub leaf_size: usize,
    /// Initial capacity of the traversal stack. The stack grows past it.
    pub traversal_stack_capacity: usize,
    /// Build each BVH at registration instead of at first pick.
    pub eager_build: bool,
}

impl Default for PickSettings {
    fn default() -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
            traversal_stack_capacity: DEFAULT_STACK_CAPACITY,
            eager_build: false,
        }
    }
}

impl PickSettings {
    /// Parse and validate settings from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: PickSettings = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values that would make building or traversal meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.leaf_size == 0 {
            return Err(PickError::InvalidSettings(
                "leaf_size must be at least 1".into(),
            ));
        }
        if self.traversal_stack_capacity == 0 {
            return Err(PickError::InvalidSettings(
                "traversal_stack_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
