//! Events and the filtered event store.
//!
//! Events are the only channel between processes. An event is handed to
//! at most one consumer: the oldest waiter whose filter accepts it, or the
//! first later `get` that matches it.

mod filter;
mod payload;
mod store;

pub use filter::EventFilter;
pub use payload::{
    ChangeKind, ClawAction, ClawRequest, ComponentChange, ObserverChange, ObserverPayload,
    PathErrorKind, PathErrorPayload, Payload,
};
pub use store::EventStore;

use crate::ecs::Entity;

pub const EXECUTE_INSTRUCTION: &str = "ExecuteInstruction";
pub const GOTO_POI: &str = "GoToPoiEvent";
pub const GOTO_POS: &str = "GoToPosEvent";
pub const END_OF_PATH: &str = "EndOfPath";
pub const OBSERVER: &str = "Observer";
pub const PATH_ERROR: &str = "PathError";
pub const STOP: &str = "stopEvent";
pub const CLAW_REQUEST: &str = "ClawRequest";
pub const CLAW_DONE: &str = "ClawDone";

/// Immutable message travelling through the event store.
#[derive(Debug, Clone)]
pub enum Event {
    Signal {
        tag: String,
        payload: Payload,
    },
    /// Domain failure concerning one entity.
    Error {
        tag: String,
        entity: Entity,
        payload: Payload,
    },
}

impl Event {
    pub fn signal(tag: impl Into<String>, payload: Payload) -> Self {
        Event::Signal {
            tag: tag.into(),
            payload,
        }
    }

    pub fn error(tag: impl Into<String>, entity: Entity, payload: Payload) -> Self {
        Event::Error {
            tag: tag.into(),
            entity,
            payload,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Event::Signal { tag, .. } | Event::Error { tag, .. } => tag,
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Event::Signal { payload, .. } | Event::Error { payload, .. } => payload,
        }
    }

    /// Entity the event is about, if any.
    pub fn entity(&self) -> Option<Entity> {
        match self {
            Event::Signal { payload, .. } => payload.entity(),
            Event::Error { entity, .. } => Some(*entity),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Event::Error { .. })
    }
}
