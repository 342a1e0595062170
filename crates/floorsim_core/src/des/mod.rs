//! Discrete-event scheduler.
//!
//! Two kinds of work share one logical thread:
//! - tick systems, run once per frame in a fixed order;
//! - processes, explicit state machines suspended on an event filter or a
//!   timeout and resumed by the scheduler.

mod context;
mod process;
mod simulation;
mod standard;

pub use context::SimContext;
pub use process::{AsAny, Process, ProcessId, TickSystem, Wake, Yield};
pub use simulation::{RunSummary, Simulation, StopReason};
pub use standard::{standard_script, StandardHandles};
