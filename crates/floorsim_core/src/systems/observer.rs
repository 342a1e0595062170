//! Change detection over a fixed list of component variants.

use crate::components::{Inventory, Path, Position, Script, Velocity};
use crate::des::{SimContext, TickSystem};
use crate::ecs::{Component, ComponentId, ComponentValue, Entity, World};
use crate::error::SimError;
use crate::events::{
    ChangeKind, ComponentChange, Event, ObserverChange, ObserverPayload, Payload, OBSERVER,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Tracked components of every entity, each list in tracking order.
pub type Snapshot = BTreeMap<Entity, Vec<Box<dyn ComponentValue>>>;

/// Publishes one event per frame describing what changed since the last
/// frame. Silent when nothing changed.
pub struct ObserverSystem {
    name: String,
    tag: String,
    tracked: Vec<ComponentId>,
    previous: Snapshot,
}

impl ObserverSystem {
    pub fn new(tracked: Vec<ComponentId>) -> Self {
        Self {
            name: "observer".to_string(),
            tag: OBSERVER.to_string(),
            tracked,
            previous: Snapshot::new(),
        }
    }

    /// Position, Velocity, Path, Script and Inventory, in that order.
    pub fn standard() -> Self {
        Self::new(vec![
            Position::ID,
            Velocity::ID,
            Path::ID,
            Script::ID,
            Inventory::ID,
        ])
    }

    /// Publish under a different tag. Lets several consumers each get their
    /// own copy of the change stream.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self.name = format!("observer:{}", self.tag);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn snapshot(&self, world: &World) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for &id in &self.tracked {
            for (entity, value) in world.snapshot_column(id) {
                snapshot.entry(entity).or_default().push(value);
            }
        }
        snapshot
    }
}

impl TickSystem for ObserverSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self, ctx: &mut SimContext) -> Result<(), SimError> {
        let current = self.snapshot(&ctx.world);
        let changes = diff_snapshots(&self.tracked, &self.previous, &current);
        self.previous = current;

        if changes.is_empty() {
            return Ok(());
        }
        trace!(entities = changes.len(), "observer publishing changes");
        ctx.publish(Event::signal(
            self.tag.clone(),
            Payload::Observer(ObserverPayload {
                timestamp: ctx.now(),
                changes,
            }),
        ));
        Ok(())
    }
}

/// Per-entity diff of two snapshots. Entities without changes are left
/// out; the result follows entity creation order.
pub fn diff_snapshots(order: &[ComponentId], old: &Snapshot, new: &Snapshot) -> Vec<ObserverChange> {
    let entities: BTreeSet<Entity> = old.keys().chain(new.keys()).copied().collect();
    entities
        .into_iter()
        .filter_map(|entity| {
            let before = old.get(&entity).map(Vec::as_slice).unwrap_or(&[]);
            let after = new.get(&entity).map(Vec::as_slice).unwrap_or(&[]);
            let changes = diff_components(order, before, after);
            (!changes.is_empty()).then_some(ObserverChange { entity, changes })
        })
        .collect()
}

/// Ordered merge of two component lists sorted by their rank in `order`.
pub fn diff_components(
    order: &[ComponentId],
    old: &[Box<dyn ComponentValue>],
    new: &[Box<dyn ComponentValue>],
) -> Vec<ComponentChange> {
    let rank = |c: &dyn ComponentValue| {
        order
            .iter()
            .position(|&id| id == c.component_id())
            .unwrap_or(usize::MAX)
    };

    let mut changes = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < old.len() || j < new.len() {
        match (old.get(i), new.get(j)) {
            (Some(o), Some(n)) => {
                let (ro, rn) = (rank(&**o), rank(&**n));
                if ro == rn {
                    if **o != **n {
                        changes.push(ComponentChange::new(n.clone(), ChangeKind::Modified));
                    }
                    i += 1;
                    j += 1;
                } else if ro < rn {
                    changes.push(ComponentChange::new(o.clone(), ChangeKind::Removed));
                    i += 1;
                } else {
                    changes.push(ComponentChange::new(n.clone(), ChangeKind::Added));
                    j += 1;
                }
            }
            (Some(o), None) => {
                changes.push(ComponentChange::new(o.clone(), ChangeKind::Removed));
                i += 1;
            }
            (None, Some(n)) => {
                changes.push(ComponentChange::new(n.clone(), ChangeKind::Added));
                j += 1;
            }
            (None, None) => break,
        }
    }
    changes
}
