use crate::config::SimulationConfig;
use crate::ecs::World;
use crate::events::{Event, EventStore};
use crate::stats::SimStats;
use crate::time::{SimClock, SimTime};

/// Everything a system or process may touch while it runs.
pub struct SimContext {
    pub clock: SimClock,
    pub world: World,
    pub events: EventStore,
    pub config: SimulationConfig,
    pub stats: SimStats,
    stop_requested: bool,
    active: bool,
}

impl SimContext {
    pub fn new(world: World, config: SimulationConfig) -> Self {
        Self {
            clock: SimClock::new(),
            world,
            events: EventStore::new(),
            config,
            stats: SimStats::new(),
            stop_requested: false,
            active: false,
        }
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn publish(&mut self, event: Event) {
        self.events.put(event);
    }

    /// Kill switch: end the run after the current instant.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Tick systems call this when they changed something this frame.
    pub fn mark_active(&mut self) {
        self.active = true;
    }

    pub(crate) fn take_active(&mut self) -> bool {
        std::mem::take(&mut self.active)
    }
}
