// simulation.rs - Frame loop, process scheduling and termination

use crate::config::SimulationConfig;
use crate::des::{Process, ProcessId, SimContext, TickSystem, Wake, Yield};
use crate::ecs::{SystemHandle, SystemRegistrationError, World};
use crate::error::SimError;
use crate::events::EventStore;
use crate::time::SimTime;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::time::Instant;
use tracing::{debug, info, trace};

const TIME_EPSILON: f64 = 1e-9;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ProcessState {
    Created,
    Running,
    Suspended,
    Terminated,
}

struct ProcessSlot {
    process: Option<Box<dyn Process>>,
    state: ProcessState,
    daemon: bool,
    /// Sequence number of the pending timeout, if suspended on one.
    timer: Option<u64>,
}

struct Timer {
    at: SimTime,
    seq: u64,
    process: ProcessId,
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // Reversed so the BinaryHeap pops the earliest timer first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Why a run ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StopReason {
    Duration,
    MaxFrames,
    KillSwitch,
    Idle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub end_time: SimTime,
    pub reason: StopReason,
}

/// Cooperative discrete-event scheduler.
///
/// Every frame runs the tick systems in registration order, then resumes
/// processes in wake order until nothing is runnable at the current
/// instant. Timeouts that fall between two frames are served at their own
/// instant before the next frame starts.
pub struct Simulation {
    ctx: SimContext,
    systems: Vec<Box<dyn TickSystem>>,
    processes: Vec<ProcessSlot>,
    ready: VecDeque<(ProcessId, Wake)>,
    timers: BinaryHeap<Timer>,
    next_timer_seq: u64,
    /// Resumptions of non-daemon processes.
    work_done: u64,
    frame: u64,
    started: bool,
    finished: bool,
}

impl Simulation {
    pub fn new(world: World, config: SimulationConfig) -> Self {
        Self {
            ctx: SimContext::new(world, config),
            systems: Vec::new(),
            processes: Vec::new(),
            ready: VecDeque::new(),
            timers: BinaryHeap::new(),
            next_timer_seq: 0,
            work_done: 0,
            frame: 0,
            started: false,
            finished: false,
        }
    }

    /// Append a tick system to the frame order. Names must be unique.
    pub fn add_system<S: TickSystem + 'static>(
        &mut self,
        system: S,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        if self.started {
            return Err(SystemRegistrationError::AlreadyStarted);
        }
        if let Some(index) = self.systems.iter().position(|s| s.name() == system.name()) {
            return Err(SystemRegistrationError::DuplicateName {
                name: system.name().to_string(),
                existing: SystemHandle::new(index as u32),
            });
        }
        let handle = SystemHandle::new(self.systems.len() as u32);
        debug!(system = system.name(), handle = %handle, "registered tick system");
        self.systems.push(Box::new(system));
        Ok(handle)
    }

    /// Register a process. It first runs during the first frame, after the
    /// tick systems, or at the current instant if the run already started.
    pub fn add_process<P: Process + 'static>(&mut self, process: P) -> ProcessId {
        let id = ProcessId::new(self.processes.len());
        debug!(process = process.name(), id = %id, "registered process");
        self.processes.push(ProcessSlot {
            daemon: process.is_daemon(),
            process: Some(Box::new(process)),
            state: ProcessState::Created,
            timer: None,
        });
        if self.started {
            self.ready.push_back((id, Wake::Start));
        }
        id
    }

    /// Borrow a registered process as its concrete type.
    pub fn process<P: Process + 'static>(&self, id: ProcessId) -> Option<&P> {
        let process: &dyn Process = self.processes.get(id.index())?.process.as_deref()?;
        process.as_any().downcast_ref::<P>()
    }

    pub fn process_mut<P: Process + 'static>(&mut self, id: ProcessId) -> Option<&mut P> {
        let process: &mut dyn Process = self.processes.get_mut(id.index())?.process.as_deref_mut()?;
        process.as_any_mut().downcast_mut::<P>()
    }

    pub fn is_terminated(&self, id: ProcessId) -> bool {
        self.processes
            .get(id.index())
            .is_some_and(|s| s.state == ProcessState::Terminated)
    }

    pub fn world(&self) -> &World {
        &self.ctx.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.ctx.world
    }

    pub fn events_mut(&mut self) -> &mut EventStore {
        &mut self.ctx.events
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SimContext {
        &mut self.ctx
    }

    pub fn now(&self) -> SimTime {
        self.ctx.now()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn frame_time(&self, frame: u64) -> SimTime {
        frame as f64 * self.ctx.config.frame_step()
    }

    /// Run one frame. Returns whether anything happened during it.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let published_before = self.ctx.events.published();
        let work_before = self.work_done;
        let frame_at = self.frame_time(self.frame);

        self.serve_timers_before(frame_at, false)?;

        self.ctx.clock.advance_to(frame_at);
        self.ctx.clock.begin_tick();
        trace!(frame = self.frame, now = frame_at, "frame start");

        for system in self.systems.iter_mut() {
            let start = Instant::now();
            let result = system.run(&mut self.ctx);
            self.ctx.stats.record_system(system.name(), start.elapsed());
            result?;
        }

        if !self.started {
            self.started = true;
            for index in 0..self.processes.len() {
                self.ready.push_back((ProcessId::new(index), Wake::Start));
            }
        }

        self.wake_due_timers(frame_at);
        self.drain_ready()?;

        self.frame += 1;
        self.ctx.stats.frames = self.frame;

        let active = self.ctx.take_active();
        Ok(active
            || self.ctx.events.published() != published_before
            || self.work_done != work_before)
    }

    /// Run frames until a stop condition holds, then finish the run.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        self.ctx.config.validate()?;
        info!(name = %self.ctx.config.name, "simulation starting");
        let reason = loop {
            if let Some(reason) = self.should_stop_before_frame()? {
                break reason;
            }
            let active = self.step()?;
            if self.ctx.stop_requested() {
                break StopReason::KillSwitch;
            }
            if self.ctx.config.duration.is_none() && !active && self.is_quiescent() {
                break StopReason::Idle;
            }
        };
        self.finish();
        let summary = RunSummary {
            frames: self.frame,
            end_time: self.now(),
            reason,
        };
        info!(?summary, "simulation stopped");
        Ok(summary)
    }

    fn should_stop_before_frame(&mut self) -> Result<Option<StopReason>, SimError> {
        if self.ctx.stop_requested() {
            return Ok(Some(StopReason::KillSwitch));
        }
        if let Some(max) = self.ctx.config.max_frames {
            if self.frame >= max {
                return Ok(Some(StopReason::MaxFrames));
            }
        }
        if let Some(duration) = self.ctx.config.duration {
            if self.frame_time(self.frame) > duration + TIME_EPSILON {
                // Timeouts that fall before the deadline still fire.
                self.serve_timers_before(duration, true)?;
                return Ok(Some(StopReason::Duration));
            }
        }
        Ok(None)
    }

    /// Nothing runnable and no pending non-daemon timeout.
    fn is_quiescent(&self) -> bool {
        self.ready.is_empty()
            && !self.ctx.events.has_wakes()
            && !self.timers.iter().any(|t| self.timer_is_live(t) && !self.processes[t.process.index()].daemon)
    }

    fn timer_is_live(&self, timer: &Timer) -> bool {
        self.processes
            .get(timer.process.index())
            .is_some_and(|s| s.timer == Some(timer.seq))
    }

    /// Serve timeouts earlier than `limit` (or equal, when `inclusive`),
    /// each at its own instant.
    fn serve_timers_before(&mut self, limit: SimTime, inclusive: bool) -> Result<(), SimError> {
        while let Some(at) = self.next_live_timer() {
            let due = if inclusive { at <= limit } else { at < limit };
            if !due {
                break;
            }
            self.ctx.clock.advance_to(at);
            self.wake_due_timers(at);
            self.drain_ready()?;
        }
        Ok(())
    }

    fn next_live_timer(&mut self) -> Option<SimTime> {
        while let Some(top) = self.timers.peek() {
            if self.timer_is_live(top) {
                return Some(top.at);
            }
            self.timers.pop();
        }
        None
    }

    fn wake_due_timers(&mut self, now: SimTime) {
        while let Some(top) = self.timers.peek() {
            if top.at > now + TIME_EPSILON {
                break;
            }
            let Some(timer) = self.timers.pop() else {
                break;
            };
            if let Some(slot) = self.processes.get_mut(timer.process.index()) {
                if slot.timer == Some(timer.seq) {
                    slot.timer = None;
                    self.ready.push_back((timer.process, Wake::Timeout));
                }
            }
        }
    }

    /// Resume processes until nothing else can run at the current instant.
    fn drain_ready(&mut self) -> Result<(), SimError> {
        loop {
            while let Some((pid, event)) = self.ctx.events.pop_wake() {
                self.ready.push_back((pid, Wake::Event(event)));
            }
            if let Some((pid, wake)) = self.ready.pop_front() {
                self.resume(pid, wake)?;
                continue;
            }
            let now = self.now();
            self.wake_due_timers(now);
            if self.ready.is_empty() && !self.ctx.events.has_wakes() {
                return Ok(());
            }
        }
    }

    fn resume(&mut self, pid: ProcessId, wake: Wake) -> Result<(), SimError> {
        let Some(slot) = self.processes.get_mut(pid.index()) else {
            return Ok(());
        };
        if slot.state == ProcessState::Terminated {
            return Ok(());
        }
        let Some(mut process) = slot.process.take() else {
            return Ok(());
        };
        slot.state = ProcessState::Running;
        if !slot.daemon {
            self.work_done += 1;
        }
        self.ctx.stats.resumptions += 1;
        trace!(process = process.name(), id = %pid, "resume");

        let result = process.resume(&mut self.ctx, wake);

        let slot = &mut self.processes[pid.index()];
        slot.process = Some(process);
        match result {
            Ok(Yield::WaitEvent(filter)) => {
                slot.state = ProcessState::Suspended;
                self.ctx.events.get(pid, filter);
            }
            Ok(Yield::Timeout(delay)) => {
                slot.state = ProcessState::Suspended;
                let seq = self.next_timer_seq;
                self.next_timer_seq += 1;
                slot.timer = Some(seq);
                let now = self.ctx.now();
                // Zero, negative and NaN delays wait for the next frame so a
                // process cannot re-arm itself within the same drain.
                let at = if delay > 0.0 {
                    now + delay
                } else {
                    let step = self.ctx.config.frame_step();
                    ((now / step + TIME_EPSILON).floor() + 1.0) * step
                };
                self.timers.push(Timer {
                    at,
                    seq,
                    process: pid,
                });
            }
            Ok(Yield::Done) => {
                slot.state = ProcessState::Terminated;
                debug!(id = %pid, "process terminated");
            }
            Err(err) => {
                slot.state = ProcessState::Terminated;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Give every live process its end-of-run callback and log stats.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        for index in 0..self.processes.len() {
            let slot = &mut self.processes[index];
            if slot.state == ProcessState::Terminated {
                continue;
            }
            if let Some(mut process) = slot.process.take() {
                process.finish(&mut self.ctx);
                self.processes[index].process = Some(process);
            }
        }
        self.ctx.stats.events_published = self.ctx.events.published();
        self.ctx.stats.events_delivered = self.ctx.events.delivered();
        self.ctx.stats.log_summary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventFilter, Payload};
    use crate::Entity;

    fn config() -> SimulationConfig {
        SimulationConfig {
            fps: 10,
            ..Default::default()
        }
    }

    fn ping(id: u64) -> Event {
        Event::signal(
            "Ping",
            Payload::Execute {
                entity: Entity::from_raw(id),
            },
        )
    }

    /// Records every wake it receives along with the time.
    struct Recorder {
        log: Vec<(SimTime, String)>,
        script: VecDeque<Yield>,
    }

    impl Recorder {
        fn new(script: Vec<Yield>) -> Self {
            Self {
                log: Vec::new(),
                script: script.into(),
            }
        }
    }

    impl Process for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError> {
            let label = match wake {
                Wake::Start => "start".to_string(),
                Wake::Timeout => "timeout".to_string(),
                Wake::Event(e) => format!("event:{}", e.entity().map(|e| e.id()).unwrap_or(0)),
            };
            self.log.push((ctx.now(), label));
            Ok(self.script.pop_front().unwrap_or(Yield::Done))
        }
    }

    struct Publisher {
        at_frame: u64,
        frames: u64,
    }

    impl TickSystem for Publisher {
        fn name(&self) -> &str {
            "publisher"
        }

        fn run(&mut self, ctx: &mut SimContext) -> Result<(), SimError> {
            if self.frames == self.at_frame {
                ctx.publish(ping(5));
            }
            self.frames += 1;
            Ok(())
        }
    }

    #[test]
    fn timeouts_resume_at_their_own_instant() {
        let mut sim = Simulation::new(World::new(), config());
        let pid = sim.add_process(Recorder::new(vec![Yield::Timeout(0.25), Yield::Done]));
        let summary = sim.run().unwrap();

        let rec = sim.process::<Recorder>(pid).unwrap();
        assert_eq!(rec.log.len(), 2);
        assert_eq!(rec.log[0], (0.0, "start".to_string()));
        assert!((rec.log[1].0 - 0.25).abs() < 1e-9);
        assert_eq!(rec.log[1].1, "timeout");
        assert_eq!(summary.reason, StopReason::Idle);
        assert!(sim.is_terminated(pid));
    }

    #[test]
    fn tick_systems_run_before_processes_start() {
        let mut sim = Simulation::new(World::new(), config());
        sim.add_system(Publisher {
            at_frame: 0,
            frames: 0,
        })
        .unwrap();
        let pid = sim.add_process(Recorder::new(vec![
            Yield::WaitEvent(EventFilter::tag("Ping")),
            Yield::Done,
        ]));
        sim.run().unwrap();

        let rec = sim.process::<Recorder>(pid).unwrap();
        let labels: Vec<&str> = rec.log.iter().map(|(_, l)| l.as_str()).collect();
        assert_eq!(labels, vec!["start", "event:5"]);
    }

    #[test]
    fn event_wakes_only_the_earliest_waiter() {
        let mut sim = Simulation::new(World::new(), config());
        sim.add_system(Publisher {
            at_frame: 2,
            frames: 0,
        })
        .unwrap();
        let first = sim.add_process(Recorder::new(vec![Yield::WaitEvent(EventFilter::tag("Ping"))]));
        let second =
            sim.add_process(Recorder::new(vec![Yield::WaitEvent(EventFilter::tag("Ping"))]));
        sim.run().unwrap();

        assert_eq!(sim.process::<Recorder>(first).unwrap().log.len(), 2);
        assert_eq!(sim.process::<Recorder>(second).unwrap().log.len(), 1);
        assert!(!sim.is_terminated(second));
    }

    #[test]
    fn zero_and_nan_timeouts_wait_for_the_next_frame() {
        let mut sim = Simulation::new(
            World::new(),
            SimulationConfig {
                max_frames: Some(10),
                ..config()
            },
        );
        let pid = sim.add_process(Recorder::new(vec![
            Yield::Timeout(0.0),
            Yield::Timeout(-1.0),
            Yield::Timeout(f64::NAN),
            Yield::Done,
        ]));
        let summary = sim.run().unwrap();

        let times: Vec<SimTime> = sim
            .process::<Recorder>(pid)
            .unwrap()
            .log
            .iter()
            .map(|(at, _)| *at)
            .collect();
        assert_eq!(times.len(), 4);
        for (frame, at) in times.iter().enumerate() {
            assert!((at - frame as f64 * 0.1).abs() < 1e-9);
        }
        assert_eq!(summary.reason, StopReason::Idle);
    }

    /// Re-arms a zero timeout forever without counting as work.
    struct Spinner(u64);

    impl Process for Spinner {
        fn name(&self) -> &str {
            "spinner"
        }

        fn is_daemon(&self) -> bool {
            true
        }

        fn resume(&mut self, _ctx: &mut SimContext, _wake: Wake) -> Result<Yield, SimError> {
            self.0 += 1;
            Ok(Yield::Timeout(0.0))
        }
    }

    #[test]
    fn zero_period_daemon_cannot_stall_a_frame() {
        let mut sim = Simulation::new(
            World::new(),
            SimulationConfig {
                duration: Some(0.5),
                max_frames: Some(3),
                ..config()
            },
        );
        let pid = sim.add_process(Spinner(0));
        let summary = sim.run().unwrap();
        assert_eq!(summary.reason, StopReason::MaxFrames);
        assert_eq!(sim.process::<Spinner>(pid).unwrap().0, 3);
    }

    #[test]
    fn invalid_config_is_rejected_before_the_first_frame() {
        let mut sim = Simulation::new(
            World::new(),
            SimulationConfig {
                fps: 0,
                ..config()
            },
        );
        assert!(matches!(sim.run(), Err(SimError::Config(_))));
        assert_eq!(sim.frame(), 0);
    }

    #[test]
    fn duration_bounds_the_run() {
        let mut sim = Simulation::new(
            World::new(),
            SimulationConfig {
                duration: Some(1.0),
                ..config()
            },
        );
        let summary = sim.run().unwrap();
        assert_eq!(summary.reason, StopReason::Duration);
        assert_eq!(summary.frames, 11);
        assert!((summary.end_time - 1.0).abs() < 1e-9);
    }

    #[test]
    fn max_frames_caps_the_run() {
        let mut sim = Simulation::new(
            World::new(),
            SimulationConfig {
                max_frames: Some(3),
                duration: Some(100.0),
                ..config()
            },
        );
        let summary = sim.run().unwrap();
        assert_eq!(summary.reason, StopReason::MaxFrames);
        assert_eq!(summary.frames, 3);
    }

    struct Killer;

    impl Process for Killer {
        fn name(&self) -> &str {
            "killer"
        }

        fn resume(&mut self, ctx: &mut SimContext, wake: Wake) -> Result<Yield, SimError> {
            match wake {
                Wake::Start => Ok(Yield::Timeout(0.5)),
                _ => {
                    ctx.request_stop();
                    Ok(Yield::Done)
                }
            }
        }
    }

    #[test]
    fn kill_switch_stops_the_run() {
        let mut sim = Simulation::new(
            World::new(),
            SimulationConfig {
                duration: Some(100.0),
                ..config()
            },
        );
        sim.add_process(Killer);
        let summary = sim.run().unwrap();
        assert_eq!(summary.reason, StopReason::KillSwitch);
        assert!(summary.end_time < 1.0);
    }

    #[test]
    fn duplicate_system_names_are_rejected() {
        let mut sim = Simulation::new(World::new(), config());
        sim.add_system(Publisher {
            at_frame: 0,
            frames: 0,
        })
        .unwrap();
        let err = sim
            .add_system(Publisher {
                at_frame: 0,
                frames: 0,
            })
            .unwrap_err();
        assert!(matches!(err, SystemRegistrationError::DuplicateName { .. }));
    }
}
