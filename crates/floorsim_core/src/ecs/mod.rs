//! Entity Component System core types.
//!
//! Components live in typed columns keyed by entity, one column per
//! component variant. Columns sit behind `RefCell`s so a system can hold
//! several columns mutably at once while the world itself is only shared.
//! Iteration always follows entity creation order, which keeps every
//! query (and everything built on top of one) deterministic.

mod column;
mod component;
mod entity;
mod macros;
mod system_handle;
mod system_registration_error;
mod world;

pub use column::Column;
pub use component::{Component, ComponentId, ComponentValue};
pub use entity::{Entity, WORLD_ENTITY};
pub use system_handle::SystemHandle;
pub use system_registration_error::SystemRegistrationError;
pub use world::{World, WorldError};
