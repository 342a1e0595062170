//! Control bridge boundary.
//!
//! Outside producers send trigger requests shaped
//! `{"type": ..., "payloadName": ..., "payload": {...}}`. Well-formed
//! requests become events in the store; anything else is rejected here and
//! never reaches the queue. Snapshots are read-only views of named
//! components.

use crate::des::{SimContext, TickSystem};
use crate::ecs::{Entity, World};
use crate::error::SimError;
use crate::events::{Event, Payload};
use crate::math::Point;
use crossbeam_channel::{Receiver, Sender};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed trigger: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("trigger has an empty type")]
    EmptyType,

    #[error("payload does not match {payload_name}: {reason}")]
    PayloadShape {
        payload_name: String,
        reason: String,
    },

    #[error("entity {0} does not exist")]
    UnknownEntity(Entity),

    #[error("unknown component '{0}'")]
    UnknownComponent(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload_name: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize)]
struct GotoPoiBody {
    entity: Entity,
    target: String,
}

#[derive(Deserialize)]
struct GotoPosBody {
    entity: Entity,
    target: [f64; 2],
}

#[derive(Deserialize)]
struct ExecuteBody {
    entity: Entity,
}

fn body<T: for<'de> Deserialize<'de>>(request: &TriggerRequest) -> Result<T, BridgeError> {
    serde_json::from_value(request.payload.clone()).map_err(|e| BridgeError::PayloadShape {
        payload_name: request.payload_name.clone(),
        reason: e.to_string(),
    })
}

/// Turn a raw trigger request into an event.
pub fn parse_trigger(raw: &str) -> Result<Event, BridgeError> {
    let request: TriggerRequest = serde_json::from_str(raw)?;
    if request.kind.trim().is_empty() {
        return Err(BridgeError::EmptyType);
    }

    let payload = match request.payload_name.as_str() {
        "GotoPoiPayload" => {
            let GotoPoiBody { entity, target } = body(&request)?;
            Payload::GotoPoi { entity, target }
        }
        "GotoPosPayload" => {
            let GotoPosBody { entity, target } = body(&request)?;
            Payload::GotoPos {
                entity,
                target: Point::from_array(target),
            }
        }
        "ExecuteInstructionPayload" => {
            let ExecuteBody { entity } = body(&request)?;
            Payload::Execute { entity }
        }
        _ => {
            if !request.payload.is_object() && !request.payload.is_null() {
                return Err(BridgeError::PayloadShape {
                    payload_name: request.payload_name.clone(),
                    reason: "payload must be an object".to_string(),
                });
            }
            let entity = request
                .payload
                .get("entity")
                .and_then(Value::as_u64)
                .map(Entity::from_raw);
            Payload::Custom {
                entity,
                name: request.payload_name.clone(),
                data: request.payload.clone(),
            }
        }
    };
    Ok(Event::signal(request.kind, payload))
}

/// JSON view of the named components of `entity`. Never mutates the world.
pub fn snapshot(world: &World, entity: Entity, components: &[&str]) -> Result<Value, BridgeError> {
    if !world.is_alive(entity) {
        return Err(BridgeError::UnknownEntity(entity));
    }
    let mut out = Map::new();
    for &name in components {
        let id = world
            .component_id_by_name(name)
            .ok_or_else(|| BridgeError::UnknownComponent(name.to_string()))?;
        let value = world
            .component_value(entity, id)
            .map(|c| c.to_json())
            .unwrap_or(Value::Null);
        out.insert(name.to_string(), value);
    }
    Ok(Value::Object(out))
}

/// Tick system draining raw triggers from a channel into the event store.
pub struct BridgeSystem {
    inbox: Receiver<String>,
}

/// Sending half for producers plus the system that consumes it.
pub fn channel() -> (Sender<String>, BridgeSystem) {
    let (tx, rx) = crossbeam_channel::unbounded::<String>();
    (tx, BridgeSystem { inbox: rx })
}

impl TickSystem for BridgeSystem {
    fn name(&self) -> &str {
        "bridge"
    }

    fn run(&mut self, ctx: &mut SimContext) -> Result<(), SimError> {
        while let Ok(raw) = self.inbox.try_recv() {
            match parse_trigger(&raw) {
                Ok(event) => {
                    debug!(tag = event.tag(), "bridge trigger accepted");
                    ctx.publish(event);
                }
                Err(err) => warn!(%err, "bridge trigger rejected"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Position, Velocity};
    use crate::config::SimulationConfig;
    use crate::events::{EventFilter, GOTO_POI, GOTO_POS};
    use serde_json::json;

    #[test]
    fn goto_triggers_become_typed_events() {
        let event = parse_trigger(
            r#"{"type": "GoToPoiEvent", "payloadName": "GotoPoiPayload", "payload": {"entity": 2, "target": "roomA"}}"#,
        )
        .unwrap();
        assert_eq!(event.tag(), GOTO_POI);
        assert!(matches!(
            event.payload(),
            Payload::GotoPoi { entity, target } if entity.id() == 2 && target == "roomA"
        ));

        let event = parse_trigger(
            r#"{"type": "GoToPosEvent", "payloadName": "GotoPosPayload", "payload": {"entity": 2, "target": [4.0, 5.5]}}"#,
        )
        .unwrap();
        assert_eq!(event.tag(), GOTO_POS);
        assert!(matches!(
            event.payload(),
            Payload::GotoPos { target, .. } if *target == Point::new(4.0, 5.5)
        ));
    }

    #[test]
    fn unknown_payload_names_pass_through_as_custom() {
        let event = parse_trigger(
            r#"{"type": "Beep", "payloadName": "BeepPayload", "payload": {"entity": 3, "volume": 7}}"#,
        )
        .unwrap();
        match event.payload() {
            Payload::Custom { entity, name, data } => {
                assert_eq!(*entity, Some(Entity::from_raw(3)));
                assert_eq!(name, "BeepPayload");
                assert_eq!(data["volume"], json!(7));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn malformed_triggers_are_rejected() {
        assert!(matches!(parse_trigger("{not json"), Err(BridgeError::Malformed(_))));
        assert!(matches!(
            parse_trigger(r#"{"payloadName": "GotoPoiPayload", "payload": {}}"#),
            Err(BridgeError::Malformed(_))
        ));
        assert!(matches!(
            parse_trigger(r#"{"type": " ", "payloadName": "X", "payload": {}}"#),
            Err(BridgeError::EmptyType)
        ));
        assert!(matches!(
            parse_trigger(
                r#"{"type": "GoToPoiEvent", "payloadName": "GotoPoiPayload", "payload": {"entity": 2}}"#
            ),
            Err(BridgeError::PayloadShape { .. })
        ));
    }

    #[test]
    fn system_publishes_good_triggers_and_drops_bad_ones() {
        let (tx, mut bridge) = channel();
        tx.send(r#"{"type": "Ping", "payloadName": "PingPayload", "payload": {}}"#.to_string())
            .unwrap();
        tx.send("garbage".to_string()).unwrap();

        let mut ctx = SimContext::new(World::new(), SimulationConfig::default());
        bridge.run(&mut ctx).unwrap();
        assert_eq!(ctx.events.len(), 1);
        assert!(ctx.events.try_take(&EventFilter::tag("Ping")).is_some());
    }

    #[test]
    fn snapshot_reads_named_components() {
        let mut world = World::new();
        let robot = world.spawn();
        world.insert(robot, Position::new(1.0, 2.0, 3.0, 4.0)).unwrap();

        let view = snapshot(&world, robot, &["Position", "Velocity"]).unwrap();
        assert_eq!(view["Position"]["x"], json!(1.0));
        assert_eq!(view["Velocity"], Value::Null);
        assert!(!world.has::<Velocity>(robot));

        assert!(matches!(
            snapshot(&world, robot, &["Teleporter"]),
            Err(BridgeError::UnknownComponent(_))
        ));
        assert!(matches!(
            snapshot(&world, Entity::from_raw(99), &["Position"]),
            Err(BridgeError::UnknownEntity(_))
        ));
    }
}
