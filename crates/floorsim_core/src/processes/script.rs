//! Script interpreter.
//!
//! Instructions are plain strings, `<Opcode> <arg> <arg>...`. The opcode is
//! looked up in an [`InstructionSet`]; the handler publishes whatever
//! events the instruction needs and tells the interpreter whether the
//! script may go on (`Ready`) or must wait for tags it recorded in
//! `Script::expecting` (`Blocked`).

use crate::components::{Script, ScriptState};
use crate::des::{Process, SimContext, Wake, Yield};
use crate::ecs::{Component, Entity};
use crate::error::{InstructionError, SimError};
use crate::events::{
    Event, EventFilter, EventStore, Payload, CLAW_DONE, END_OF_PATH, EXECUTE_INSTRUCTION,
    PATH_ERROR,
};
use crate::processes::{claw, goto};
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

pub type InstructionHandler =
    Box<dyn Fn(Entity, &[&str], &mut Script, &mut EventStore) -> Result<ScriptState, InstructionError>>;

/// Opcode -> handler table.
#[derive(Default)]
pub struct InstructionSet {
    handlers: BTreeMap<String, InstructionHandler>,
}

impl InstructionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Go`, `Grab` and `Drop`.
    pub fn standard() -> Self {
        Self::new()
            .with("Go", goto::go_instruction)
            .with("Grab", claw::grab_instruction)
            .with("Drop", claw::drop_instruction)
    }

    pub fn with<F>(mut self, opcode: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Entity, &[&str], &mut Script, &mut EventStore) -> Result<ScriptState, InstructionError>
            + 'static,
    {
        self.insert(opcode, handler);
        self
    }

    pub fn insert<F>(&mut self, opcode: impl Into<String>, handler: F)
    where
        F: Fn(Entity, &[&str], &mut Script, &mut EventStore) -> Result<ScriptState, InstructionError>
            + 'static,
    {
        self.handlers.insert(opcode.into(), Box::new(handler));
    }

    pub fn get(&self, opcode: &str) -> Option<&InstructionHandler> {
        self.handlers.get(opcode)
    }

    pub fn contains(&self, opcode: &str) -> bool {
        self.handlers.contains_key(opcode)
    }
}

pub fn execute_event(entity: Entity) -> Event {
    Event::signal(EXECUTE_INSTRUCTION, Payload::Execute { entity })
}

pub struct ScriptInterpreter {
    instructions: InstructionSet,
    completion_tags: Vec<String>,
    error_tags: Vec<String>,
}

impl ScriptInterpreter {
    pub fn new(instructions: InstructionSet) -> Self {
        Self {
            instructions,
            completion_tags: vec![END_OF_PATH.to_string(), CLAW_DONE.to_string()],
            error_tags: vec![PATH_ERROR.to_string()],
        }
    }

    /// Also listen for `tag` as an instruction completion.
    pub fn with_completion_tag(mut self, tag: impl Into<String>) -> Self {
        self.completion_tags.push(tag.into());
        self
    }

    /// Also route error events tagged `tag` to script error handlers.
    pub fn with_error_tag(mut self, tag: impl Into<String>) -> Self {
        self.error_tags.push(tag.into());
        self
    }

    fn filter(&self) -> EventFilter {
        let mut tags = vec![EXECUTE_INSTRUCTION.to_string()];
        tags.extend(self.completion_tags.iter().cloned());
        tags.extend(self.error_tags.iter().cloned());
        EventFilter::tags(tags)
    }

    fn kick_off(&self, ctx: &mut SimContext) -> Result<(), SimError> {
        let scripted = ctx.world.query(&[Script::ID]);
        for entity in scripted {
            ctx.publish(execute_event(entity));
        }
        Ok(())
    }

    fn execute(&self, ctx: &mut SimContext, entity: Entity) -> Result<(), SimError> {
        let now = ctx.now();
        let Ok(mut script) = ctx.world.get_mut::<Script>(entity) else {
            warn!(%entity, "execute request for entity without script");
            return Ok(());
        };
        if script.state != ScriptState::Ready {
            if script.state == ScriptState::Blocked {
                warn!(%entity, "execute request while script is blocked");
            }
            return Ok(());
        }
        let Some(line) = script.current().map(str::to_string) else {
            script.state = ScriptState::Done;
            return Ok(());
        };

        let mut words = line.split_whitespace();
        let opcode = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let next = match self.instructions.get(opcode) {
            Some(handler) => handler(entity, &args, &mut *script, &mut ctx.events).map_err(
                |source| SimError::Instruction {
                    entity,
                    instruction: line.clone(),
                    source,
                },
            )?,
            None => {
                warn!(%entity, opcode, "unknown instruction, skipping");
                ScriptState::Ready
            }
        };
        script.log(format!("[{now:.3}] {line}"));
        debug!(%entity, instruction = %line, state = ?next, "executed");

        match next {
            ScriptState::Ready => {
                if script.advance() == ScriptState::Ready {
                    ctx.events.put(execute_event(entity));
                }
            }
            other => script.state = other,
        }
        Ok(())
    }

    fn complete(&self, ctx: &mut SimContext, event: &Event) {
        let tag = event.tag();
        let Some(entity) = event.entity() else {
            warn!(tag, "completion event without entity");
            return;
        };
        let Ok(mut script) = ctx.world.get_mut::<Script>(entity) else {
            debug!(%entity, tag, "completion for unscripted entity");
            return;
        };
        if !script.fulfil(tag) {
            warn!(%entity, tag, "was not expecting this event");
            return;
        }
        if script.expecting.is_empty() && script.advance() == ScriptState::Ready {
            ctx.events.put(execute_event(entity));
        }
    }

    fn handle_error(&self, ctx: &mut SimContext, event: &Event) -> Result<(), SimError> {
        let Some(entity) = event.entity() else {
            error!(tag = event.tag(), "error event without entity");
            return Ok(());
        };
        let handler = ctx
            .world
            .get::<Script>(entity)
            .ok()
            .and_then(|s| s.error_handlers.get(event.tag()).cloned());
        match handler {
            Some(handler) => handler.call(event, ctx),
            None => {
                error!(%entity, tag = event.tag(), payload = ?event.payload(), "unhandled error event");
                Ok(())
            }
        }
    }
}

impl Process for ScriptInterpreter {
    fn name(&self) -> &str {
        "script_interpreter"
    }

    fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError> {
        match wake {
            Wake::Start => self.kick_off(ctx)?,
            Wake::Event(event) => {
                if event.tag() == EXECUTE_INSTRUCTION {
                    if let Some(entity) = event.entity() {
                        self.execute(ctx, entity)?;
                    }
                } else if event.is_error() && self.error_tags.iter().any(|t| t == event.tag()) {
                    self.handle_error(ctx, &event)?;
                } else if self.completion_tags.iter().any(|t| t == event.tag()) {
                    self.complete(ctx, &event);
                } else {
                    warn!(tag = event.tag(), "unexpected event");
                }
            }
            Wake::Timeout => {}
        }
        Ok(Yield::WaitEvent(self.filter()))
    }
}
