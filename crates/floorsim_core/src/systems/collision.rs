use crate::components::{Collidable, Position, SectorGrid, SectorId, Velocity};
use crate::config::SimulationConfig;
use crate::des::{SimContext, TickSystem};
use crate::ecs::{Component, Entity};
use crate::error::SimError;
use crate::events::{Event, Payload, STOP};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Broad phase over a sector hash, narrow phase on AABB overlap.
///
/// Every moving collidable entity is checked against collidables whose
/// boxes cover its own or an adjacent sector. Each contact produces one
/// stop event per frame.
pub struct CollisionSystem {
    grid: SectorGrid,
}

impl CollisionSystem {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            grid: SectorGrid::new(config.sector_size, config.window.width),
        }
    }

    fn covered_cells(&self, pos: &Position, margin: i64) -> Vec<SectorId> {
        let (lo, hi) = pos.bounds();
        let (c0, r0) = self.grid.cell_of(lo);
        let (c1, r1) = self.grid.cell_of(hi);
        let mut cells = Vec::new();
        for row in (r0 - margin)..=(r1 + margin) {
            for column in (c0 - margin)..=(c1 + margin) {
                if self.grid.contains_cell((column, row)) {
                    cells.push(self.grid.sector_of_cell((column, row)));
                }
            }
        }
        cells
    }
}

impl TickSystem for CollisionSystem {
    fn name(&self) -> &str {
        "collision"
    }

    fn run(&mut self, ctx: &mut SimContext) -> Result<(), SimError> {
        let solids = ctx.world.query(&[Position::ID, Collidable::ID]);
        if solids.len() < 2 {
            return Ok(());
        }

        let mut contacts: Vec<(Entity, Entity)> = Vec::new();
        {
            let positions = ctx.world.column::<Position>()?;
            let velocities = ctx.world.column::<Velocity>()?;

            let mut index: HashMap<SectorId, Vec<Entity>> = HashMap::new();
            for &entity in &solids {
                if let Some(pos) = positions.get(entity) {
                    for cell in self.covered_cells(pos, 0) {
                        index.entry(cell).or_default().push(entity);
                    }
                }
            }

            for &entity in &solids {
                let moving = velocities.get(entity).is_some_and(Velocity::is_moving);
                let Some(pos) = positions.get(entity) else {
                    continue;
                };
                if !moving || !pos.movable {
                    continue;
                }
                let candidates: BTreeSet<Entity> = self
                    .covered_cells(pos, 1)
                    .into_iter()
                    .filter_map(|cell| index.get(&cell))
                    .flatten()
                    .copied()
                    .filter(|&other| other != entity)
                    .collect();
                for other in candidates {
                    if positions.get(other).is_some_and(|o| pos.overlaps(o)) {
                        contacts.push((entity, other));
                    }
                }
            }
        }

        for (entity, other) in contacts {
            debug!(%entity, %other, "collision");
            ctx.publish(Event::signal(STOP, Payload::Stop { entity, other }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::World;
    use crate::events::EventFilter;

    fn world_with_wall() -> (World, Entity) {
        let mut world = World::new();
        let wall = world.spawn();
        world
            .insert(wall, Position::new(100.0, 0.0, 10.0, 500.0).fixed())
            .unwrap();
        world.insert(wall, Collidable).unwrap();
        (world, wall)
    }

    #[test]
    fn overlapping_mover_gets_one_stop_event() {
        let (mut world, wall) = world_with_wall();
        let robot = world.spawn();
        world.insert(robot, Position::new(95.0, 300.0, 10.0, 10.0)).unwrap();
        world.insert(robot, Velocity::new(1.0, 0.0)).unwrap();
        world.insert(robot, Collidable).unwrap();

        let mut ctx = SimContext::new(world, SimulationConfig::default());
        let mut collision = CollisionSystem::new(&ctx.config);
        collision.run(&mut ctx).unwrap();

        assert_eq!(ctx.events.len(), 1);
        let event = ctx.events.try_take(&EventFilter::tag(STOP)).unwrap();
        match event.payload() {
            Payload::Stop { entity, other } => {
                assert_eq!(*entity, robot);
                assert_eq!(*other, wall);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn resting_or_distant_bodies_do_not_collide() {
        let (mut world, _) = world_with_wall();
        let parked = world.spawn();
        world.insert(parked, Position::new(95.0, 10.0, 10.0, 10.0)).unwrap();
        world.insert(parked, Velocity::default()).unwrap();
        world.insert(parked, Collidable).unwrap();
        let far = world.spawn();
        world.insert(far, Position::new(400.0, 10.0, 10.0, 10.0)).unwrap();
        world.insert(far, Velocity::new(1.0, 0.0)).unwrap();
        world.insert(far, Collidable).unwrap();

        let mut ctx = SimContext::new(world, SimulationConfig::default());
        let mut collision = CollisionSystem::new(&ctx.config);
        collision.run(&mut ctx).unwrap();
        assert!(ctx.events.is_empty());
    }
}
