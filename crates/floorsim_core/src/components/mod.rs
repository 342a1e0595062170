//! Built-in component variants.
//!
//! IDs 1..=99 are reserved for the kernel; user components registered with
//! `World::register` should pick ids above that range.

mod collidable;
mod inventory;
mod map;
mod path;
mod position;
mod script;
mod velocity;

pub use collidable::Collidable;
pub use inventory::Inventory;
pub use map::Map;
pub use path::Path;
pub use position::{Position, SectorGrid, SectorId};
pub use script::{ErrorHandler, Script, ScriptState};
pub use velocity::Velocity;

use crate::ecs::ComponentId;

pub const POSITION_ID: ComponentId = 1;
pub const VELOCITY_ID: ComponentId = 2;
pub const PATH_ID: ComponentId = 3;
pub const SCRIPT_ID: ComponentId = 4;
pub const MAP_ID: ComponentId = 5;
pub const INVENTORY_ID: ComponentId = 6;
pub const COLLIDABLE_ID: ComponentId = 7;
