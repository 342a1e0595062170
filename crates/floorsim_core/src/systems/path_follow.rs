use crate::components::{Path, Position, Velocity};
use crate::des::{SimContext, TickSystem};
use crate::ecs::{Component, Entity};
use crate::error::SimError;
use crate::events::{Event, Payload, END_OF_PATH};
use crate::for_each_entity;
use crate::math::{same_place, Point};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Steers entities along their Path and detaches it at the last waypoint.
#[derive(Default)]
pub struct PathFollowSystem {
    /// Velocity each entity had before it started following a path.
    initial_velocity: BTreeMap<Entity, (f64, f64)>,
}

impl PathFollowSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn steer(point: Point, pos: &Position, vel: &mut Velocity, speed: f64) {
        let speed = speed.abs();
        let delta = point - pos.center();
        vel.x = delta.x.clamp(-speed, speed);
        vel.y = delta.y.clamp(-speed, speed);
    }

    /// Give back the pre-path velocity of entities whose Path was taken
    /// away by someone else.
    fn release_detached(&mut self, ctx: &mut SimContext) -> Result<(), SimError> {
        let following = ctx.world.query(&[Path::ID]);
        let detached: Vec<Entity> = self
            .initial_velocity
            .keys()
            .copied()
            .filter(|e| following.binary_search(e).is_err())
            .collect();
        for entity in detached {
            if let Some((x, y)) = self.initial_velocity.remove(&entity) {
                if let Ok(mut vel) = ctx.world.get_mut::<Velocity>(entity) {
                    vel.x = x;
                    vel.y = y;
                }
            }
        }
        Ok(())
    }
}

impl TickSystem for PathFollowSystem {
    fn name(&self) -> &str {
        "path_follow"
    }

    fn run(&mut self, ctx: &mut SimContext) -> Result<(), SimError> {
        self.release_detached(ctx)?;

        let mut finished: Vec<(Entity, Vec<Point>)> = Vec::new();
        let mut steering = false;
        let initial_velocity = &mut self.initial_velocity;
        for_each_entity!(ctx.world, [Position, Velocity, Path], |entity, (pos, vel, path)| {
            steering = true;
            let initial = *initial_velocity.entry(entity).or_insert((vel.x, vel.y));

            let Some(mut point) = path.current() else {
                warn!(%entity, "empty path removed");
                finished.push((entity, Vec::new()));
                (vel.x, vel.y) = initial;
                initial_velocity.remove(&entity);
                continue;
            };

            if same_place(point, pos.center()) {
                path.curr_point += 1;
                match path.current() {
                    Some(next) => point = next,
                    None => {
                        (vel.x, vel.y) = initial;
                        initial_velocity.remove(&entity);
                        finished.push((entity, path.points.clone()));
                        continue;
                    }
                }
            }
            Self::steer(point, pos, vel, path.speed);
        });

        let now = ctx.now();
        for (entity, points) in finished {
            ctx.world.remove::<Path>(entity);
            debug!(%entity, waypoints = points.len(), "path finished");
            ctx.publish(Event::signal(
                END_OF_PATH,
                Payload::EndOfPath {
                    entity,
                    timestamp: now,
                    path: points,
                },
            ));
        }
        if steering {
            ctx.mark_active();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::ecs::World;
    use crate::events::EventFilter;
    use crate::systems::MovementSystem;

    fn robot(ctx_world: &mut World, path: Path, vel: Velocity) -> Entity {
        let e = ctx_world.spawn();
        ctx_world
            .insert(e, Position::centered(Point::new(10.0, 10.0), 2.0, 2.0))
            .unwrap();
        ctx_world.insert(e, vel).unwrap();
        ctx_world.insert(e, path).unwrap();
        e
    }

    #[test]
    fn steering_is_clamped_to_speed() {
        let mut world = World::new();
        let e = robot(
            &mut world,
            Path::with_speed(vec![Point::new(30.0, 12.0)], 5.0),
            Velocity::default(),
        );
        let mut ctx = SimContext::new(world, SimulationConfig::default());
        PathFollowSystem::new().run(&mut ctx).unwrap();
        let vel = ctx.world.get::<Velocity>(e).unwrap();
        assert_eq!((vel.x, vel.y), (5.0, 2.0));
    }

    #[test]
    fn reaching_the_last_point_detaches_and_restores_velocity() {
        let mut world = World::new();
        let e = robot(
            &mut world,
            Path::new(vec![Point::new(13.0, 10.0), Point::new(13.0, 6.0)]),
            Velocity::new(0.5, 0.0),
        );
        let mut ctx = SimContext::new(world, SimulationConfig::default());
        let mut follow = PathFollowSystem::new();
        let mut movement = MovementSystem::new(&ctx.config);

        for _ in 0..10 {
            movement.run(&mut ctx).unwrap();
            follow.run(&mut ctx).unwrap();
            if !ctx.world.has::<Path>(e) {
                break;
            }
        }

        assert!(!ctx.world.has::<Path>(e));
        assert_eq!(ctx.world.get::<Position>(e).unwrap().center(), Point::new(13.0, 6.0));
        let vel = *ctx.world.get::<Velocity>(e).unwrap();
        assert_eq!((vel.x, vel.y), (0.5, 0.0));

        let event = ctx.events.try_take(&EventFilter::tag(END_OF_PATH)).unwrap();
        match event.payload() {
            Payload::EndOfPath { entity, path, .. } => {
                assert_eq!(*entity, e);
                assert_eq!(path.len(), 2);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn removed_path_gives_velocity_back() {
        let mut world = World::new();
        let e = robot(
            &mut world,
            Path::new(vec![Point::new(50.0, 10.0)]),
            Velocity::new(-1.0, 0.0),
        );
        let mut ctx = SimContext::new(world, SimulationConfig::default());
        let mut follow = PathFollowSystem::new();
        follow.run(&mut ctx).unwrap();
        assert_eq!(ctx.world.get::<Velocity>(e).unwrap().x, 5.0);

        ctx.world.remove::<Path>(e);
        follow.run(&mut ctx).unwrap();
        assert_eq!(ctx.world.get::<Velocity>(e).unwrap().x, -1.0);
    }

    #[test]
    fn empty_path_still_ends() {
        let mut world = World::new();
        let e = robot(&mut world, Path::new(Vec::new()), Velocity::default());
        let mut ctx = SimContext::new(world, SimulationConfig::default());
        PathFollowSystem::new().run(&mut ctx).unwrap();
        assert!(!ctx.world.has::<Path>(e));
        assert!(ctx.events.try_take(&EventFilter::tag(END_OF_PATH)).is_some());
    }
}
