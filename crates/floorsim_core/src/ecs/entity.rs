//! Entity handle
//!
//! Entities are plain 64-bit handles. Ids are handed out in increasing
//! order and never reused within a world, so ordering entities by id is
//! ordering them by creation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity handle (opaque, creation-ordered ID)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(u64);

/// Entity reserved for the world itself (map, loose objects).
pub const WORLD_ENTITY: Entity = Entity(1);

impl Entity {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
