//! Simulation settings

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("fps must be at least 1")]
    ZeroFps,

    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

/// Run-wide settings shared by every system and process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Name reported in the telemetry header.
    pub name: String,
    /// Frames per simulated second.
    pub fps: u32,
    /// Stop once this much simulated time has elapsed. `None` runs until idle.
    pub duration: Option<f64>,
    /// Hard cap on frames, mostly a guard for tests.
    pub max_frames: Option<u64>,
    pub window: WindowSettings,
    pub sector_size: f64,
    /// Default speed of newly planned paths.
    pub path_speed: f64,
    /// Time the claw takes to grab or drop an object.
    pub claw_delay: f64,
    /// Reporting period of the Seer.
    pub seer_interval: f64,
}

/// Floorplan bounds. Positions are clamped to `[0, width] x [0, height]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: f64,
    pub height: f64,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            name: "simulation".to_string(),
            fps: 60,
            duration: None,
            max_frames: None,
            window: WindowSettings::default(),
            sector_size: 50.0,
            path_speed: 5.0,
            claw_delay: 1.0,
            seer_interval: 0.05,
        }
    }
}

impl SimulationConfig {
    /// Simulated seconds between two frames.
    pub fn frame_step(&self) -> f64 {
        1.0 / f64::from(self.fps.max(1))
    }

    /// Reject settings that would stall or divide the frame loop.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 {
            return Err(ConfigError::ZeroFps);
        }
        let positive = [
            ("sector_size", self.sector_size),
            ("path_speed", self.path_speed),
            ("claw_delay", self.claw_delay),
            ("seer_interval", self.seer_interval),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }
}
