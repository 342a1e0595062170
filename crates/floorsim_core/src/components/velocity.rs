use crate::define_component;
use serde::{Deserialize, Serialize};

/// Linear rate per frame plus angular rate in degrees per frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub alpha: f64,
}

define_component!(Velocity, super::VELOCITY_ID, "Velocity");

impl Velocity {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, alpha: 0.0 }
    }

    pub fn is_moving(&self) -> bool {
        self.x != 0.0 || self.y != 0.0
    }
}
