//! Per-run counters and tick-system timings

use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Clone)]
pub struct SimStats {
    pub frames: u64,
    pub resumptions: u64,
    pub events_published: u64,
    pub events_delivered: u64,
    system_time: BTreeMap<String, Duration>,
}

impl SimStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge `elapsed` wall time to the tick system `name`.
    pub fn record_system(&mut self, name: &str, elapsed: Duration) {
        *self
            .system_time
            .entry(name.to_string())
            .or_insert(Duration::ZERO) += elapsed;
    }

    pub fn system_time(&self, name: &str) -> Duration {
        self.system_time.get(name).copied().unwrap_or(Duration::ZERO)
    }

    pub fn iter_systems(&self) -> impl Iterator<Item = (&String, &Duration)> {
        self.system_time.iter()
    }

    pub fn log_summary(&self) {
        info!(
            frames = self.frames,
            resumptions = self.resumptions,
            published = self.events_published,
            delivered = self.events_delivered,
            "run finished"
        );
        for (name, elapsed) in &self.system_time {
            info!(system = %name, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "system time");
        }
    }
}
