use crate::des::SimContext;
use crate::error::SimError;
use crate::events::{Event, EventFilter};
use std::any::Any;
use std::fmt;

/// Handle of a process registered with a simulation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(usize);

impl ProcessId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Why a process is being resumed.
#[derive(Debug, Clone)]
pub enum Wake {
    /// First resumption.
    Start,
    /// An event matching the last `WaitEvent` filter.
    Event(Event),
    /// The last `Timeout` elapsed.
    Timeout,
}

/// How a process suspends after a resumption.
#[derive(Debug)]
pub enum Yield {
    WaitEvent(EventFilter),
    /// Resume after this many simulated seconds.
    Timeout(f64),
    Done,
}

/// Upcast helper so concrete processes can be inspected after a run.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Event-driven task written as an explicit state machine.
pub trait Process: AsAny {
    fn name(&self) -> &str;

    fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError>;

    /// Called once when the run ends and the process has not terminated.
    fn finish(&mut self, _ctx: &mut SimContext) {}

    /// Daemon processes (periodic reporters) do not keep an otherwise idle
    /// run alive.
    fn is_daemon(&self) -> bool {
        false
    }
}

/// Work run once per frame, in registration order. Never suspends.
pub trait TickSystem {
    fn name(&self) -> &str;

    fn run(&mut self, ctx: &mut SimContext) -> Result<(), SimError>;
}
