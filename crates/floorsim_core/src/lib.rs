//! Floorsim Core
//!
//! Discrete-event simulation kernel for scripted agents moving through a
//! floorplan:
//! - Entity Component System (ECS)
//! - Simulated clock, filtered event store and cooperative scheduler
//! - Change detection (observer), path planning, script interpretation
//! - Sequential requirement verification

pub mod bridge;
pub mod components;
pub mod config;
pub mod des;
pub mod ecs;
pub mod error;
pub mod events;
pub mod math;
pub mod navigation;
pub mod processes;
pub mod stats;
pub mod systems;
pub mod time;

pub use config::{ConfigError, SimulationConfig};
pub use des::{Process, ProcessId, SimContext, Simulation, TickSystem, Wake, Yield};
pub use ecs::{Component, ComponentId, Entity, World, WORLD_ENTITY};
pub use error::{InstructionError, SimError};
pub use events::{Event, EventFilter, EventStore, Payload};

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
