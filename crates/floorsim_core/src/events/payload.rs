use crate::components::Path;
use crate::ecs::{ComponentValue, Entity};
use crate::math::Point;
use crate::time::SimTime;
use serde_json::Value;

/// Typed event bodies.
#[derive(Debug, Clone)]
pub enum Payload {
    Execute {
        entity: Entity,
    },
    GotoPoi {
        entity: Entity,
        target: String,
    },
    GotoPos {
        entity: Entity,
        target: Point,
    },
    EndOfPath {
        entity: Entity,
        timestamp: SimTime,
        path: Vec<Point>,
    },
    Observer(ObserverPayload),
    PathError(PathErrorPayload),
    Stop {
        entity: Entity,
        other: Entity,
    },
    Claw(ClawRequest),
    ClawDone {
        entity: Entity,
    },
    /// Anything the kernel has no dedicated type for (bridge triggers).
    Custom {
        entity: Option<Entity>,
        name: String,
        data: Value,
    },
}

impl Payload {
    pub fn entity(&self) -> Option<Entity> {
        match self {
            Payload::Execute { entity }
            | Payload::GotoPoi { entity, .. }
            | Payload::GotoPos { entity, .. }
            | Payload::EndOfPath { entity, .. }
            | Payload::Stop { entity, .. }
            | Payload::ClawDone { entity } => Some(*entity),
            Payload::PathError(p) => Some(p.entity),
            Payload::Claw(c) => Some(c.entity),
            Payload::Custom { entity, .. } => *entity,
            Payload::Observer(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One component-level change. `Removed` carries the old value, the
/// others the new one.
#[derive(Debug, Clone)]
pub struct ComponentChange {
    pub component: Box<dyn ComponentValue>,
    pub kind: ChangeKind,
}

impl ComponentChange {
    pub fn new(component: Box<dyn ComponentValue>, kind: ChangeKind) -> Self {
        Self { component, kind }
    }
}

impl PartialEq for ComponentChange {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && *self.component == *other.component
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObserverChange {
    pub entity: Entity,
    pub changes: Vec<ComponentChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObserverPayload {
    pub timestamp: SimTime,
    pub changes: Vec<ObserverChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathErrorKind {
    /// No route; `best_path` leads as close to the target as possible.
    PathNotFound { best_path: Path },
    PoiNotFound { poi: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathErrorPayload {
    pub entity: Entity,
    pub error: PathErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClawAction {
    Grab,
    Drop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClawRequest {
    pub entity: Entity,
    pub object: String,
    pub action: ClawAction,
}
