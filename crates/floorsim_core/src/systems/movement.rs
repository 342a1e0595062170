use crate::components::{Position, SectorGrid, Velocity};
use crate::config::SimulationConfig;
use crate::des::{SimContext, TickSystem};
use crate::error::SimError;
use crate::for_each_entity;
use crate::math::Point;

/// Applies Velocity to Position, clamped to the floorplan.
pub struct MovementSystem {
    min: Point,
    max: Point,
    grid: SectorGrid,
    sectors_ready: bool,
}

impl MovementSystem {
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_bounds(
            Point::ZERO,
            Point::new(config.window.width, config.window.height),
            SectorGrid::new(config.sector_size, config.window.width),
        )
    }

    pub fn with_bounds(min: Point, max: Point, grid: SectorGrid) -> Self {
        Self {
            min,
            max,
            grid,
            sectors_ready: false,
        }
    }

    /// Tile every Position once, before the first move.
    fn assign_sectors(&mut self, ctx: &mut SimContext) -> Result<(), SimError> {
        let mut positions = ctx.world.column_mut::<Position>()?;
        for (_, pos) in positions.iter_mut() {
            pos.set_grid(self.grid);
        }
        self.sectors_ready = true;
        Ok(())
    }
}

impl TickSystem for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn run(&mut self, ctx: &mut SimContext) -> Result<(), SimError> {
        if !self.sectors_ready {
            self.assign_sectors(ctx)?;
        }

        let (min, max) = (self.min, self.max);
        let mut moved = false;
        for_each_entity!(ctx.world, [Position, Velocity], |_entity, (pos, vel)| {
            pos.changed = false;
            let x = (pos.x() + vel.x).max(min.x).min(max.x - pos.w());
            let y = (pos.y() + vel.y).max(min.y).min(max.y - pos.h());
            if x != pos.x() || y != pos.y() {
                pos.set_xy(x, y);
                moved = true;
            }
            if vel.alpha != 0.0 {
                pos.rotate(vel.alpha);
                moved = true;
            }
        });

        if moved {
            ctx.mark_active();
        }
        Ok(())
    }
}
