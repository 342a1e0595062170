//! Fatal simulation errors

use crate::config::ConfigError;
use crate::ecs::{Entity, SystemRegistrationError, WorldError};
use thiserror::Error;

/// Errors that abort a run. Domain failures (no route, unknown POI) are
/// published as error events instead and never show up here.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("missing simulation context: {0}")]
    MissingContext(&'static str),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error("entity {entity} failed to execute '{instruction}'")]
    Instruction {
        entity: Entity,
        instruction: String,
        #[source]
        source: InstructionError,
    },

    #[error(transparent)]
    Registration(#[from] SystemRegistrationError),
}

/// Malformed script instruction.
#[derive(Debug, Error, PartialEq)]
pub enum InstructionError {
    #[error("{opcode} expects {usage}, got {got} argument(s)")]
    Arity {
        opcode: String,
        usage: &'static str,
        got: usize,
    },

    #[error("{opcode}: invalid argument '{value}'")]
    InvalidArgument { opcode: String, value: String },
}
