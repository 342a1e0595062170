//! Sequential requirement verifier.
//!
//! Requirements are checked in order against observer payloads; only the
//! current one is evaluated. The verdict is Success once every requirement
//! succeeded, Failure as soon as one fails or if the run ends first.

use crate::components::{Inventory, Position};
use crate::des::{Process, SimContext, Wake, Yield};
use crate::ecs::Entity;
use crate::error::SimError;
use crate::events::{ChangeKind, EventFilter, ObserverPayload, Payload, OBSERVER};
use crate::math::Point;
use tracing::{info, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TesterState {
    Running,
    Success,
    Failure,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequireState {
    Success,
    Failure,
    Continue,
}

pub type Requirement = Box<dyn FnMut(&ObserverPayload) -> RequireState>;

pub struct TesterProcess {
    requirements: Vec<(String, Requirement)>,
    counter: usize,
    state: TesterState,
    tag: String,
    stop_on_verdict: bool,
}

impl TesterProcess {
    pub fn new() -> Self {
        Self {
            requirements: Vec::new(),
            counter: 0,
            state: TesterState::Running,
            tag: OBSERVER.to_string(),
            stop_on_verdict: false,
        }
    }

    pub fn with_requirement<F>(mut self, label: impl Into<String>, requirement: F) -> Self
    where
        F: FnMut(&ObserverPayload) -> RequireState + 'static,
    {
        self.requirements.push((label.into(), Box::new(requirement)));
        self
    }

    /// Listen to observer payloads published under `tag`.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Stop the whole run once a verdict is reached.
    pub fn stop_on_verdict(mut self, stop: bool) -> Self {
        self.stop_on_verdict = stop;
        self
    }

    pub fn state(&self) -> TesterState {
        self.state
    }

    /// Number of requirements already satisfied.
    pub fn passed(&self) -> usize {
        self.counter
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Label of the requirement currently under evaluation.
    pub fn pending(&self) -> Option<&str> {
        self.requirements.get(self.counter).map(|(l, _)| l.as_str())
    }

    fn evaluate(&mut self, payload: &ObserverPayload) {
        let Some((label, requirement)) = self.requirements.get_mut(self.counter) else {
            return;
        };
        match requirement(payload) {
            RequireState::Success => {
                info!(requirement = %label, at = payload.timestamp, "requirement met");
                self.counter += 1;
            }
            RequireState::Failure => {
                warn!(requirement = %label, at = payload.timestamp, "requirement failed");
                self.state = TesterState::Failure;
            }
            RequireState::Continue => {}
        }
    }

    fn verdict(&mut self, ctx: &mut SimContext) -> Option<Yield> {
        if self.state == TesterState::Running && self.counter == self.requirements.len() {
            self.state = TesterState::Success;
        }
        if self.state == TesterState::Running {
            return None;
        }
        info!(state = ?self.state, passed = self.counter, total = self.requirements.len(), "verdict");
        if self.stop_on_verdict {
            ctx.request_stop();
        }
        Some(Yield::Done)
    }
}

impl Default for TesterProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for TesterProcess {
    fn name(&self) -> &str {
        "tester"
    }

    fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError> {
        if let Wake::Event(event) = wake {
            if let Payload::Observer(payload) = event.payload() {
                self.evaluate(payload);
            }
        }
        if let Some(done) = self.verdict(ctx) {
            return Ok(done);
        }
        Ok(Yield::WaitEvent(EventFilter::tag(self.tag.clone())))
    }

    fn finish(&mut self, _ctx: &mut SimContext) {
        if self.state == TesterState::Running {
            warn!(pending = ?self.pending(), passed = self.counter, "run ended before all requirements were met");
            self.state = TesterState::Failure;
        }
    }
}

/// Succeeds when `entity`'s Position (top-left corner) is added or
/// modified within `tolerance` of `point`.
pub fn near_position(
    entity: Entity,
    point: Point,
    tolerance: f64,
) -> impl FnMut(&ObserverPayload) -> RequireState {
    move |payload| {
        let hit = payload
            .changes
            .iter()
            .filter(|c| c.entity == entity)
            .flat_map(|c| c.changes.iter())
            .filter(|c| matches!(c.kind, ChangeKind::Added | ChangeKind::Modified))
            .filter_map(|c| c.component.downcast_ref::<Position>())
            .any(|pos| Point::new(pos.x(), pos.y()).distance_squared(point) <= tolerance * tolerance);
        if hit {
            RequireState::Success
        } else {
            RequireState::Continue
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InventoryChange {
    Added,
    Removed,
}

/// Succeeds when `entity`'s Inventory changes so that `object` is present
/// (`Added`) or absent (`Removed`).
pub fn changed_inventory(
    entity: Entity,
    object: impl Into<String>,
    change: InventoryChange,
) -> impl FnMut(&ObserverPayload) -> RequireState {
    let object = object.into();
    move |payload| {
        let hit = payload
            .changes
            .iter()
            .filter(|c| c.entity == entity)
            .flat_map(|c| c.changes.iter())
            .any(|c| {
                let Some(inventory) = c.component.downcast_ref::<Inventory>() else {
                    return false;
                };
                match (change, c.kind) {
                    (InventoryChange::Added, ChangeKind::Added | ChangeKind::Modified) => {
                        inventory.contains(&object)
                    }
                    (InventoryChange::Removed, ChangeKind::Modified) => !inventory.contains(&object),
                    (InventoryChange::Removed, ChangeKind::Removed) => inventory.contains(&object),
                    _ => false,
                }
            });
        if hit {
            RequireState::Success
        } else {
            RequireState::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::ecs::World;
    use crate::events::{ComponentChange, Event, ObserverChange};
    use serde_json::json;

    fn ctx() -> SimContext {
        SimContext::new(World::new(), SimulationConfig::default())
    }

    fn observed(entity: Entity, component: impl crate::ecs::Component, kind: ChangeKind) -> Wake {
        Wake::Event(Event::signal(
            OBSERVER,
            Payload::Observer(ObserverPayload {
                timestamp: 1.0,
                changes: vec![ObserverChange {
                    entity,
                    changes: vec![ComponentChange::new(Box::new(component), kind)],
                }],
            }),
        ))
    }

    fn always(result: RequireState) -> impl FnMut(&ObserverPayload) -> RequireState {
        move |_| result
    }

    #[test]
    fn all_successes_give_success() {
        let mut ctx = ctx();
        let robot = Entity::from_raw(2);
        let mut tester = TesterProcess::new()
            .with_requirement("a", always(RequireState::Success))
            .with_requirement("b", always(RequireState::Success))
            .with_requirement("c", always(RequireState::Success));
        assert!(matches!(tester.resume(&mut ctx, Wake::Start).unwrap(), Yield::WaitEvent(_)));
        for _ in 0..2 {
            let wake = observed(robot, Position::new(0.0, 0.0, 1.0, 1.0), ChangeKind::Added);
            assert!(matches!(tester.resume(&mut ctx, wake).unwrap(), Yield::WaitEvent(_)));
        }
        let wake = observed(robot, Position::new(0.0, 0.0, 1.0, 1.0), ChangeKind::Added);
        assert!(matches!(tester.resume(&mut ctx, wake).unwrap(), Yield::Done));
        assert_eq!(tester.state(), TesterState::Success);
        assert_eq!(tester.passed(), 3);
    }

    #[test]
    fn failure_is_final_and_later_requirements_are_not_evaluated() {
        let mut ctx = ctx();
        let robot = Entity::from_raw(2);
        let mut tester = TesterProcess::new()
            .with_requirement("first", always(RequireState::Failure))
            .with_requirement("second", |_: &ObserverPayload| -> RequireState {
                panic!("must not be evaluated")
            })
            .stop_on_verdict(true);
        tester.resume(&mut ctx, Wake::Start).unwrap();
        let wake = observed(robot, Position::new(0.0, 0.0, 1.0, 1.0), ChangeKind::Added);
        assert!(matches!(tester.resume(&mut ctx, wake).unwrap(), Yield::Done));
        assert_eq!(tester.state(), TesterState::Failure);
        assert_eq!(tester.pending(), Some("first"));
        assert!(ctx.stop_requested());
    }

    #[test]
    fn running_out_of_time_is_failure() {
        let mut ctx = ctx();
        let mut tester = TesterProcess::new().with_requirement("never", always(RequireState::Continue));
        tester.resume(&mut ctx, Wake::Start).unwrap();
        tester.finish(&mut ctx);
        assert_eq!(tester.state(), TesterState::Failure);
    }

    #[test]
    fn no_requirements_succeeds_at_start() {
        let mut ctx = ctx();
        let mut tester = TesterProcess::new();
        assert!(matches!(tester.resume(&mut ctx, Wake::Start).unwrap(), Yield::Done));
        assert_eq!(tester.state(), TesterState::Success);
    }

    #[test]
    fn near_position_uses_corner_and_inclusive_tolerance() {
        let robot = Entity::from_raw(2);
        let mut near = near_position(robot, Point::new(10.0, 10.0), 5.0);
        let payload = |pos: Position, kind| ObserverPayload {
            timestamp: 0.0,
            changes: vec![ObserverChange {
                entity: robot,
                changes: vec![ComponentChange::new(Box::new(pos), kind)],
            }],
        };
        assert_eq!(
            near(&payload(Position::new(13.0, 14.0, 2.0, 2.0), ChangeKind::Modified)),
            RequireState::Success
        );
        assert_eq!(
            near(&payload(Position::new(13.0, 14.0, 2.0, 2.0), ChangeKind::Removed)),
            RequireState::Continue
        );
        assert_eq!(
            near(&payload(Position::new(16.0, 10.0, 2.0, 2.0), ChangeKind::Added)),
            RequireState::Continue
        );
    }

    #[test]
    fn changed_inventory_tracks_object_presence() {
        let world_entity = Entity::from_raw(1);
        let payload = |inv: Inventory| ObserverPayload {
            timestamp: 0.0,
            changes: vec![ObserverChange {
                entity: world_entity,
                changes: vec![ComponentChange::new(Box::new(inv), ChangeKind::Modified)],
            }],
        };
        let full = Inventory::new().with_object("medicine", json!(1));

        let mut removed = changed_inventory(world_entity, "medicine", InventoryChange::Removed);
        assert_eq!(removed(&payload(full.clone())), RequireState::Continue);
        assert_eq!(removed(&payload(Inventory::new())), RequireState::Success);

        let mut added = changed_inventory(world_entity, "medicine", InventoryChange::Added);
        assert_eq!(added(&payload(Inventory::new())), RequireState::Continue);
        assert_eq!(added(&payload(full)), RequireState::Success);
    }
}
