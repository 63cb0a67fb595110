//! Opaque entity identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a pickable entity.
///
/// The registry never interprets the value; it is only used as a map key.
/// [`EntityId::NONE`] (0) is reserved for "no entity" in a [`crate::Hit`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The "no entity" sentinel.
    pub const NONE: EntityId = EntityId(0);

    /// True for the sentinel.
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        EntityId(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
