//! Position telemetry for external consumers.
//!
//! Both reporters open with a header message (`timestamp: -1`, window name
//! and dimensions) and then send one JSON object per report, mapping entity
//! ids to their geometry plus the report `timestamp`. Every message carries
//! a running index.

use crate::components::Position;
use crate::config::SimulationConfig;
use crate::des::{Process, SimContext, Wake, Yield};
use crate::ecs::Entity;
use crate::error::SimError;
use crate::events::{ChangeKind, EventFilter, ObserverPayload, Payload, OBSERVER};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

pub type Consumer = Box<dyn FnMut(&Value, u64)>;

/// Fan-out to consumers with a message counter.
#[derive(Default)]
pub struct TelemetrySink {
    consumers: Vec<Consumer>,
    msg_idx: u64,
}

impl TelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consumer<F>(mut self, consumer: F) -> Self
    where
        F: FnMut(&Value, u64) + 'static,
    {
        self.consumers.push(Box::new(consumer));
        self
    }

    pub fn send(&mut self, message: &Value) {
        for consumer in self.consumers.iter_mut() {
            consumer(message, self.msg_idx);
        }
        trace!(idx = self.msg_idx, "telemetry message sent");
        self.msg_idx += 1;
    }

    pub fn sent(&self) -> u64 {
        self.msg_idx
    }
}

fn header(config: &SimulationConfig) -> Value {
    json!({
        "timestamp": -1,
        "window_name": config.name,
        "dimensions": {
            "width": config.window.width,
            "height": config.window.height,
        },
    })
}

fn geometry(pos: &Position) -> Value {
    json!({
        "x": pos.x(),
        "y": pos.y(),
        "width": pos.w(),
        "height": pos.h(),
        "angle": pos.angle(),
    })
}

fn timestamp(now: f64) -> Value {
    json!((now * 1000.0).round() / 1000.0)
}

/// Reports entities whose Position the observer saw added or modified.
pub struct WatcherProcess {
    sink: TelemetrySink,
    tag: String,
}

impl WatcherProcess {
    pub fn new(sink: TelemetrySink) -> Self {
        Self {
            sink,
            tag: OBSERVER.to_string(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn sink(&self) -> &TelemetrySink {
        &self.sink
    }

    fn report(&mut self, ctx: &SimContext, payload: &ObserverPayload) {
        let mut message = Map::new();
        for change in &payload.changes {
            let moved = change.changes.iter().any(|c| {
                c.component.is::<Position>() && matches!(c.kind, ChangeKind::Added | ChangeKind::Modified)
            });
            if !moved {
                continue;
            }
            if let Ok(pos) = ctx.world.get::<Position>(change.entity) {
                message.insert(change.entity.to_string(), geometry(&pos));
            }
        }
        if !message.is_empty() {
            message.insert("timestamp".to_string(), timestamp(payload.timestamp));
            self.sink.send(&Value::Object(message));
        }
    }
}

impl Process for WatcherProcess {
    fn name(&self) -> &str {
        "watcher"
    }

    fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError> {
        match wake {
            Wake::Start => self.sink.send(&header(&ctx.config)),
            Wake::Event(event) => {
                if let Payload::Observer(payload) = event.payload() {
                    self.report(ctx, payload);
                }
            }
            Wake::Timeout => {}
        }
        Ok(Yield::WaitEvent(EventFilter::tag(self.tag.clone())))
    }
}

/// Polls Positions every `seer_interval` and reports the ones that moved
/// since the previous report. Sends a message every interval, even an
/// empty one.
pub struct SeerProcess {
    sink: TelemetrySink,
    reported: BTreeMap<Entity, Position>,
}

impl SeerProcess {
    pub fn new(sink: TelemetrySink) -> Self {
        Self {
            sink,
            reported: BTreeMap::new(),
        }
    }

    pub fn sink(&self) -> &TelemetrySink {
        &self.sink
    }

    fn scan(&mut self, ctx: &SimContext) -> Result<(), SimError> {
        let mut message = Map::new();
        message.insert("timestamp".to_string(), timestamp(ctx.now()));
        let positions = ctx.world.column::<Position>()?;
        for (entity, pos) in positions.iter() {
            if self.reported.get(entity) == Some(pos) {
                continue;
            }
            message.insert(entity.to_string(), geometry(pos));
            self.reported.insert(*entity, pos.clone());
        }
        drop(positions);
        self.sink.send(&Value::Object(message));
        Ok(())
    }
}

impl Process for SeerProcess {
    fn name(&self) -> &str {
        "seer"
    }

    fn is_daemon(&self) -> bool {
        true
    }

    fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError> {
        if let Wake::Start = wake {
            self.sink.send(&header(&ctx.config));
        }
        self.scan(ctx)?;
        Ok(Yield::Timeout(ctx.config.seer_interval))
    }
}
