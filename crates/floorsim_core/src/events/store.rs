use crate::des::ProcessId;
use crate::events::{Event, EventFilter};
use std::collections::VecDeque;
use tracing::trace;

struct Waiter {
    process: ProcessId,
    filter: EventFilter,
}

/// FIFO event queue with filtered, suspending consumers.
///
/// Delivery never happens behind the scheduler's back: matched events are
/// parked in a wake list that the scheduler drains in order.
#[derive(Default)]
pub struct EventStore {
    queue: VecDeque<Event>,
    waiters: Vec<Waiter>,
    wakes: VecDeque<(ProcessId, Event)>,
    published: u64,
    delivered: u64,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event. Never blocks.
    ///
    /// The oldest suspended waiter whose filter accepts the event gets it;
    /// otherwise it stays queued for a later `get`.
    pub fn put(&mut self, event: Event) {
        self.published += 1;
        match self.waiters.iter().position(|w| w.filter.matches(&event)) {
            Some(index) => {
                let waiter = self.waiters.remove(index);
                trace!(tag = event.tag(), process = %waiter.process, "event handed to waiter");
                self.delivered += 1;
                self.wakes.push_back((waiter.process, event));
            }
            None => self.queue.push_back(event),
        }
    }

    /// Request the oldest queued event matching `filter` for `process`.
    ///
    /// Returns `true` when an event was found immediately; otherwise the
    /// process is registered as a waiter.
    pub fn get(&mut self, process: ProcessId, filter: EventFilter) -> bool {
        if let Some(event) = self.take_matching(&filter) {
            self.delivered += 1;
            self.wakes.push_back((process, event));
            return true;
        }
        self.waiters.push(Waiter { process, filter });
        false
    }

    /// Remove and return the oldest queued event matching `filter` without
    /// suspending anyone.
    pub fn try_take(&mut self, filter: &EventFilter) -> Option<Event> {
        let event = self.take_matching(filter)?;
        self.delivered += 1;
        Some(event)
    }

    fn take_matching(&mut self, filter: &EventFilter) -> Option<Event> {
        let index = self.queue.iter().position(|e| filter.matches(e))?;
        self.queue.remove(index)
    }

    /// Drop any suspension held by `process`.
    pub fn cancel(&mut self, process: ProcessId) {
        self.waiters.retain(|w| w.process != process);
    }

    pub fn is_waiting(&self, process: ProcessId) -> bool {
        self.waiters.iter().any(|w| w.process == process)
    }

    pub(crate) fn pop_wake(&mut self) -> Option<(ProcessId, Event)> {
        self.wakes.pop_front()
    }

    pub fn has_wakes(&self) -> bool {
        !self.wakes.is_empty()
    }

    /// Queued, undelivered events in publish order.
    pub fn pending(&self) -> impl Iterator<Item = &Event> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}
