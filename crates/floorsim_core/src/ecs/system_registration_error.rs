use crate::ecs::SystemHandle;
use thiserror::Error;

/// Errors that can occur while registering a tick system with a simulation.
#[derive(Debug, Error)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered (handle {existing})")]
    DuplicateName { name: String, existing: SystemHandle },

    #[error("systems cannot be registered once the simulation has started")]
    AlreadyStarted,
}
