use crate::components::{Path, Position};
use crate::des::{Process, SimContext, Wake, Yield};
use crate::ecs::Entity;
use crate::error::SimError;
use crate::events::{EventFilter, Payload, STOP};
use tracing::{debug, warn};

/// Pushes a colliding entity back out of the obstacle and cancels its path.
#[derive(Debug, Default)]
pub struct StopCollisionProcess;

impl StopCollisionProcess {
    pub fn new() -> Self {
        Self
    }

    fn separate(ctx: &mut SimContext, entity: Entity, other: Entity) -> Result<(), SimError> {
        let obstacle = ctx.world.get::<Position>(other)?.clone();
        {
            let mut pos = ctx.world.get_mut::<Position>(entity)?;
            let (me, them) = (pos.center(), obstacle.center());
            let mut x = pos.x();
            let mut y = pos.y();
            if me.x < them.x {
                x = obstacle.x() - pos.w() - 1.0;
            } else if me.x > them.x {
                x = obstacle.x() + obstacle.w() + 1.0;
            }
            if me.y < them.y {
                y = obstacle.y() - pos.h() - 1.0;
            } else if me.y > them.y {
                y = obstacle.y() + obstacle.h() + 1.0;
            }
            pos.set_xy(x, y);
            debug!(%entity, %other, x, y, "pushed out of obstacle");
        }
        ctx.world.remove::<Path>(entity);
        Ok(())
    }
}

impl Process for StopCollisionProcess {
    fn name(&self) -> &str {
        "stop_collision"
    }

    fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError> {
        if let Wake::Event(event) = wake {
            match event.payload() {
                Payload::Stop { entity, other } => Self::separate(ctx, *entity, *other)?,
                payload => warn!(?payload, "stop event with unexpected payload"),
            }
        }
        Ok(Yield::WaitEvent(EventFilter::tag(STOP)))
    }
}
