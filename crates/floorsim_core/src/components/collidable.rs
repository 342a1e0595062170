use crate::define_component;
use serde::{Deserialize, Serialize};

/// Marks a Position box as solid. Walls carry it with a fixed Position;
/// robots carry it to be stopped by walls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Collidable;

define_component!(Collidable, super::COLLIDABLE_ID, "Collidable");
