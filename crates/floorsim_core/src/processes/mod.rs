//! Event-driven processes and the instructions that talk to them.

pub mod claw;
pub mod goto;
pub mod script;
pub mod stop_collision;
pub mod telemetry;
pub mod tester;

pub use claw::ClawProcess;
pub use goto::{path_error_handler, GotoProcess};
pub use script::{execute_event, InstructionHandler, InstructionSet, ScriptInterpreter};
pub use stop_collision::StopCollisionProcess;
pub use telemetry::{Consumer, SeerProcess, TelemetrySink, WatcherProcess};
pub use tester::{
    changed_inventory, near_position, InventoryChange, RequireState, Requirement, TesterProcess,
    TesterState,
};
