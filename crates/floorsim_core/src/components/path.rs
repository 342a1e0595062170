use crate::define_component;
use crate::math::Point;
use serde::{Deserialize, Serialize};

/// Waypoints an entity is currently following.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub points: Vec<Point>,
    pub curr_point: usize,
    pub speed: f64,
}

define_component!(Path, super::PATH_ID, "Path");

impl Path {
    pub const DEFAULT_SPEED: f64 = 5.0;

    pub fn new(points: Vec<Point>) -> Self {
        Self::with_speed(points, Self::DEFAULT_SPEED)
    }

    pub fn with_speed(points: Vec<Point>, speed: f64) -> Self {
        Self {
            points,
            curr_point: 0,
            speed,
        }
    }

    /// Waypoint currently steered towards.
    pub fn current(&self) -> Option<Point> {
        self.points.get(self.curr_point).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }
}
