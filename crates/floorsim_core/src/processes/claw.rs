use crate::components::{Inventory, Script, ScriptState};
use crate::des::{Process, SimContext, Wake, Yield};
use crate::ecs::{Entity, WORLD_ENTITY};
use crate::error::{InstructionError, SimError};
use crate::events::{
    ClawAction, ClawRequest, Event, EventFilter, EventStore, Payload, CLAW_DONE, CLAW_REQUEST,
};
use tracing::{debug, warn};

/// Moves objects between the world inventory and an entity's inventory.
/// The transfer lands `claw_delay` after the request; one request at a time.
#[derive(Default)]
pub struct ClawProcess {
    pending: Option<ClawRequest>,
}

impl ClawProcess {
    pub fn new() -> Self {
        Self::default()
    }

    fn transfer(ctx: &mut SimContext, request: &ClawRequest) -> Result<(), SimError> {
        if !ctx.world.has::<Inventory>(request.entity) {
            ctx.world.insert(request.entity, Inventory::new())?;
        }
        if !ctx.world.has::<Inventory>(WORLD_ENTITY) {
            ctx.world.insert(WORLD_ENTITY, Inventory::new())?;
        }
        let (from, to) = match request.action {
            ClawAction::Grab => (WORLD_ENTITY, request.entity),
            ClawAction::Drop => (request.entity, WORLD_ENTITY),
        };

        let taken = ctx.world.get_mut::<Inventory>(from)?.take(&request.object);
        match taken {
            Some(data) => {
                ctx.world.get_mut::<Inventory>(to)?.add(request.object.clone(), data);
                debug!(entity = %request.entity, object = %request.object, action = ?request.action, "claw transfer");
            }
            None => {
                warn!(entity = %request.entity, object = %request.object, action = ?request.action, "object not found");
            }
        }
        Ok(())
    }
}

impl Process for ClawProcess {
    fn name(&self) -> &str {
        "claw"
    }

    fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError> {
        match wake {
            Wake::Event(event) => {
                if let Payload::Claw(request) = event.payload() {
                    debug!(entity = %request.entity, object = %request.object, "claw moving");
                    self.pending = Some(request.clone());
                    return Ok(Yield::Timeout(ctx.config.claw_delay));
                }
                warn!(tag = event.tag(), "claw request with unexpected payload");
            }
            Wake::Timeout => {
                if let Some(request) = self.pending.take() {
                    Self::transfer(ctx, &request)?;
                    ctx.publish(Event::signal(
                        CLAW_DONE,
                        Payload::ClawDone {
                            entity: request.entity,
                        },
                    ));
                }
            }
            Wake::Start => {}
        }
        Ok(Yield::WaitEvent(EventFilter::tag(CLAW_REQUEST)))
    }
}

fn claw_instruction(
    opcode: &str,
    action: ClawAction,
    entity: Entity,
    args: &[&str],
    script: &mut Script,
    events: &mut EventStore,
) -> Result<ScriptState, InstructionError> {
    let [object] = args else {
        return Err(InstructionError::Arity {
            opcode: opcode.to_string(),
            usage: "<object>",
            got: args.len(),
        });
    };
    events.put(Event::signal(
        CLAW_REQUEST,
        Payload::Claw(ClawRequest {
            entity,
            object: object.to_string(),
            action,
        }),
    ));
    script.expect(CLAW_DONE);
    Ok(ScriptState::Blocked)
}

/// `Grab <object>`
pub fn grab_instruction(
    entity: Entity,
    args: &[&str],
    script: &mut Script,
    events: &mut EventStore,
) -> Result<ScriptState, InstructionError> {
    claw_instruction("Grab", ClawAction::Grab, entity, args, script, events)
}

/// `Drop <object>`
pub fn drop_instruction(
    entity: Entity,
    args: &[&str],
    script: &mut Script,
    events: &mut EventStore,
) -> Result<ScriptState, InstructionError> {
    claw_instruction("Drop", ClawAction::Drop, entity, args, script, events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::des::Simulation;
    use crate::ecs::World;
    use crate::processes::{InstructionSet, ScriptInterpreter};
    use serde_json::json;

    fn sim(instructions: &[&str]) -> (Simulation, Entity) {
        let mut world = World::new();
        let root = world.spawn();
        world
            .insert(root, Inventory::new().with_object("medicine", json!({"dose": 2})))
            .unwrap();
        let robot = world.spawn();
        world.insert(robot, Script::new(instructions.iter().copied())).unwrap();
        let config = SimulationConfig {
            fps: 10,
            claw_delay: 0.5,
            max_frames: Some(40),
            ..Default::default()
        };
        let mut sim = Simulation::new(world, config);
        sim.add_process(ClawProcess::new());
        sim.add_process(ScriptInterpreter::new(InstructionSet::standard()));
        (sim, robot)
    }

    #[test]
    fn grab_takes_from_world_after_delay() {
        let (mut sim, robot) = sim(&["Grab medicine"]);
        sim.step().unwrap();
        assert!(!sim.world().has::<Inventory>(robot));
        assert!(sim.world().get::<Inventory>(WORLD_ENTITY).unwrap().contains("medicine"));
        assert_eq!(sim.world().get::<Script>(robot).unwrap().state, ScriptState::Blocked);

        let summary = sim.run().unwrap();
        assert_eq!(sim.world().get::<Script>(robot).unwrap().state, ScriptState::Done);
        assert!(sim.world().get::<Inventory>(robot).unwrap().contains("medicine"));
        assert!(!sim.world().get::<Inventory>(WORLD_ENTITY).unwrap().contains("medicine"));
        assert!(summary.end_time >= 0.5);
    }

    #[test]
    fn grab_then_drop_returns_object() {
        let (mut sim, robot) = sim(&["Grab medicine", "Drop medicine"]);
        sim.run().unwrap();
        assert_eq!(sim.world().get::<Script>(robot).unwrap().state, ScriptState::Done);
        assert!(sim.world().get::<Inventory>(robot).unwrap().is_empty());
        assert!(sim.world().get::<Inventory>(WORLD_ENTITY).unwrap().contains("medicine"));
    }

    #[test]
    fn missing_object_still_completes() {
        let (mut sim, robot) = sim(&["Grab scalpel"]);
        sim.run().unwrap();
        assert_eq!(sim.world().get::<Script>(robot).unwrap().state, ScriptState::Done);
        assert!(sim.world().get::<Inventory>(robot).unwrap().is_empty());
    }

    #[test]
    fn claw_instructions_take_one_argument() {
        let mut events = EventStore::new();
        let mut script = Script::new(["Grab"]);
        let err = grab_instruction(Entity::from_raw(2), &[], &mut script, &mut events).unwrap_err();
        assert_eq!(
            err,
            InstructionError::Arity {
                opcode: "Grab".to_string(),
                usage: "<object>",
                got: 0
            }
        );
        assert!(events.is_empty());
    }
}
