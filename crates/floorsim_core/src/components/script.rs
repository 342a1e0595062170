use crate::des::SimContext;
use crate::define_component;
use crate::error::SimError;
use crate::events::Event;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScriptState {
    Ready,
    Blocked,
    Done,
}

/// Callback invoked when an error event for the scripted entity arrives.
#[derive(Clone)]
pub struct ErrorHandler(Rc<dyn Fn(&Event, &mut SimContext) -> Result<(), SimError>>);

impl ErrorHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event, &mut SimContext) -> Result<(), SimError> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &Event, ctx: &mut SimContext) -> Result<(), SimError> {
        (self.0)(event, ctx)
    }
}

impl PartialEq for ErrorHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorHandler")
    }
}

/// Instruction list with an instruction pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Script {
    pub instructions: Vec<String>,
    pub curr_instruction: usize,
    pub state: ScriptState,
    /// Event tags the current instruction is blocked on (multiset).
    pub expecting: Vec<String>,
    pub logs: Vec<String>,
    #[serde(skip)]
    pub error_handlers: BTreeMap<String, ErrorHandler>,
}

define_component!(Script, super::SCRIPT_ID, "Script");

impl Script {
    pub fn new<I, S>(instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let instructions: Vec<String> = instructions.into_iter().map(Into::into).collect();
        let state = if instructions.is_empty() {
            ScriptState::Done
        } else {
            ScriptState::Ready
        };
        Self {
            instructions,
            curr_instruction: 0,
            state,
            expecting: Vec::new(),
            logs: Vec::new(),
            error_handlers: BTreeMap::new(),
        }
    }

    pub fn with_error_handler(mut self, tag: impl Into<String>, handler: ErrorHandler) -> Self {
        self.error_handlers.insert(tag.into(), handler);
        self
    }

    /// Instruction under the pointer, if the script is not done.
    pub fn current(&self) -> Option<&str> {
        if self.state == ScriptState::Done {
            return None;
        }
        self.instructions.get(self.curr_instruction).map(String::as_str)
    }

    /// Move past the current instruction. Returns the new state.
    pub fn advance(&mut self) -> ScriptState {
        self.curr_instruction += 1;
        self.expecting.clear();
        self.state = if self.curr_instruction >= self.instructions.len() {
            ScriptState::Done
        } else {
            ScriptState::Ready
        };
        self.state
    }

    pub fn expect(&mut self, tag: impl Into<String>) {
        self.expecting.push(tag.into());
    }

    /// Remove one occurrence of `tag` from the expected set.
    pub fn fulfil(&mut self, tag: &str) -> bool {
        match self.expecting.iter().position(|t| t == tag) {
            Some(i) => {
                self.expecting.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn log(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }
}
