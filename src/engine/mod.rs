//!
//! Central primitives for driving a discrete event simulation.
//!
//! The [`Engine`] owns the simulated clock, the future event list, the six
//! engine-owned event sources and the registry of monitored statistics. It
//! exposes the scheduling API and the firing primitives that run policies
//! are built from; a [`Simulation`] pairs an engine with a [`RunPolicy`]
//! into a runnable experiment.
//!

use std::any::Any;
use std::rc::Rc;

use log::warn;

use crate::stats::StatRef;
use crate::time::SimTime;

mod event;
pub use self::event::*;

mod source;
pub use self::source::*;

mod event_list;
use self::event_list::EventList;

mod context;
pub use self::context::*;

mod limit;
pub use self::limit::*;

mod error;
pub use self::error::*;

mod bench;
pub use self::bench::*;

mod builder;
pub use self::builder::*;

mod policy;
pub use self::policy::*;

mod sim;
pub use self::sim::*;

mod single;
pub use self::single::*;

mod replications;
pub use self::replications::*;

mod batch_means;
pub use self::batch_means::*;

pub(crate) const LOG_TARGET: &str = "desim::engine";

/// A statistic under monitoring, together with the engine's note of whether
/// its steady-state entry has already been observed.
struct StatEntry {
    stat: StatRef,
    steady_state_seen: bool,
}

///
/// The core discrete-event scheduler.
///
/// The engine fires events in non-decreasing simulated time, FIFO among
/// equal fire times. Every firing is wrapped by the before/after bracket
/// sources while they have sinks, and after every firing the registered
/// statistics are consulted for the precision-based stop rule.
///
/// An engine does not provide an output-analysis method by itself; it is
/// driven by the [`RunPolicy`] of the surrounding [`Simulation`] (single
/// run, independent replications, batch means). Engines cannot be cloned,
/// and all operations on one instance must stay on a single thread;
/// independent engines may run on distinct threads without coordination.
///
pub struct Engine {
    evt_list: EventList,

    bos_src: SourceRef,
    eos_src: SourceRef,
    bef_src: SourceRef,
    aef_src: SourceRef,
    si_src: SourceRef,
    sf_src: SourceRef,

    start_time: SimTime,
    sim_time: SimTime,
    last_evt_time: SimTime,
    end_of_sim: bool,

    num_events: usize,
    num_usr_events: usize,

    stats: Vec<StatEntry>,

    pub(crate) limit: RunLimit,
    pub(crate) quiet: bool,
    pub(crate) profiler: Profiler,
}

impl Engine {
    /// Creates a new engine with an empty event list, a clock at zero and
    /// the six engine-owned event sources.
    #[must_use]
    pub fn new() -> Self {
        Self {
            evt_list: EventList::new(),

            bos_src: EventSource::new("Begin of Simulation"),
            eos_src: EventSource::new("End of Simulation"),
            bef_src: EventSource::new("Before Event Firing"),
            aef_src: EventSource::new("After Event Firing"),
            si_src: EventSource::new("System Initialization"),
            sf_src: EventSource::new("System Finalization"),

            start_time: SimTime::ZERO,
            sim_time: SimTime::ZERO,
            last_evt_time: SimTime::ZERO,
            end_of_sim: true,

            num_events: 0,
            num_usr_events: 0,

            stats: Vec::new(),

            limit: RunLimit::None,
            quiet: false,
            profiler: Profiler::default(),
        }
    }

    // Accessors

    /// Returns the simulated time to date.
    #[must_use]
    pub fn simulated_time(&self) -> SimTime {
        self.sim_time
    }

    /// Returns the simulated time of the last fired event.
    #[must_use]
    pub fn last_event_time(&self) -> SimTime {
        self.last_evt_time
    }

    /// Tells whether the simulation is done.
    #[must_use]
    pub fn end_of_simulation(&self) -> bool {
        self.end_of_sim
    }

    /// Returns the total number of fired events, including internal ones.
    #[must_use]
    pub fn num_events(&self) -> usize {
        self.num_events
    }

    /// Returns the number of fired events from user-created sources.
    #[must_use]
    pub fn num_user_events(&self) -> usize {
        self.num_usr_events
    }

    /// Returns the number of events waiting in the event list.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.evt_list.len()
    }

    /// Returns the profiler of the most recent run.
    #[must_use]
    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Changes the simulated time the clock starts on. Takes effect for the
    /// next experiment.
    pub fn set_start_time(&mut self, time: SimTime) {
        self.start_time = time;
        self.sim_time = time;
        self.last_evt_time = time;
    }

    // Engine-owned event sources

    /// The source of the BEGIN-OF-SIMULATION event, fired just before the
    /// simulation begins.
    #[must_use]
    pub fn begin_of_sim_source(&self) -> &SourceRef {
        &self.bos_src
    }

    /// The source of the END-OF-SIMULATION event, fired just after the
    /// simulation ends. Firing it ends the run.
    #[must_use]
    pub fn end_of_sim_source(&self) -> &SourceRef {
        &self.eos_src
    }

    /// The source of the BEFORE-EVENT-FIRING bracket, fired just before
    /// every event if any sink is connected.
    #[must_use]
    pub fn before_event_firing_source(&self) -> &SourceRef {
        &self.bef_src
    }

    /// The source of the AFTER-EVENT-FIRING bracket, fired just after
    /// every event if any sink is connected.
    #[must_use]
    pub fn after_event_firing_source(&self) -> &SourceRef {
        &self.aef_src
    }

    /// The source of the SYSTEM-INITIALIZATION event, fired just before an
    /// experiment starts. Initial events are usually scheduled from here.
    #[must_use]
    pub fn system_initialization_source(&self) -> &SourceRef {
        &self.si_src
    }

    /// The source of the SYSTEM-FINALIZATION event, fired just after an
    /// experiment ends.
    #[must_use]
    pub fn system_finalization_source(&self) -> &SourceRef {
        &self.sf_src
    }

    // Scheduling

    ///
    /// Schedules a new event to be fired by `source` at the given time.
    ///
    /// Returns a handle that can be used to reschedule or cancel the event.
    /// Scheduling from a disabled source is refused with a warning and
    /// returns `None`; a fire time in the past is clamped to the current
    /// clock value with a warning.
    ///
    /// Note that run policies clear the event list when a run starts, so
    /// initial events belong into sinks of the SYSTEM-INITIALIZATION
    /// source rather than ahead of [`Simulation::run`].
    ///
    pub fn schedule(&mut self, source: &SourceRef, time: SimTime) -> Option<EventRef> {
        self.schedule_data(source, time, EventData::None)
    }

    /// Schedules a new event carrying a type-erased payload,
    /// see [`schedule`](Engine::schedule).
    pub fn schedule_with<T: Any>(
        &mut self,
        source: &SourceRef,
        time: SimTime,
        payload: T,
    ) -> Option<EventRef> {
        self.schedule_data(source, time, EventData::Payload(Box::new(payload)))
    }

    fn schedule_data(
        &mut self,
        source: &SourceRef,
        mut time: SimTime,
        data: EventData,
    ) -> Option<EventRef> {
        if !source.enabled() {
            warn!(
                target: LOG_TARGET,
                "tried to schedule an event from the disabled event source '{}' at time {} (clock: {})",
                source, time, self.sim_time
            );
            return None;
        }

        if time < self.sim_time {
            warn!(
                target: LOG_TARGET,
                "fire time of event <{} @ {}> refers to the past: synced to current time ({})",
                source, time, self.sim_time
            );
            time = self.sim_time;
        }

        let event = Event::new_scheduled(Rc::clone(source), self.sim_time, time, data);
        self.evt_list.push(Rc::clone(&event));
        Some(event)
    }

    ///
    /// Moves a pending event to a new fire time.
    ///
    /// The event keeps its identity but is treated as a fresh insertion for
    /// FIFO tie-breaking. No-ops with a warning if the source is disabled,
    /// if the event is not currently pending, if the new time is essentially
    /// equal to the current fire time, or if both the new time and the
    /// current fire time lie in the past.
    ///
    pub fn reschedule(&mut self, event: &EventRef, mut time: SimTime) {
        if !event.source().enabled() {
            warn!(
                target: LOG_TARGET,
                "tried to reschedule an event from the disabled event source '{}' at time {} (clock: {})",
                event.source(), time, self.sim_time
            );
            return;
        }

        if !self.evt_list.contains(event) {
            warn!(
                target: LOG_TARGET,
                "event {event} is not pending and will not be rescheduled"
            );
            return;
        }

        if time < self.sim_time {
            if event.fire_time() > self.sim_time {
                warn!(
                    target: LOG_TARGET,
                    "new fire time ({}) of event {} refers to the past and will be adjusted to current time ({})",
                    time, event, self.sim_time
                );
                time = self.sim_time;
            } else {
                warn!(
                    target: LOG_TARGET,
                    "new fire time ({time}) of event {event} refers to the past and will not be rescheduled"
                );
                return;
            }
        }

        if time.essentially_eq(event.fire_time()) {
            warn!(
                target: LOG_TARGET,
                "new fire time ({time}) of event {event} is approximately equal to the old one and will not be rescheduled"
            );
            return;
        }

        self.evt_list.erase(event);
        event.set_fire_time(time);
        self.evt_list.push(Rc::clone(event));
    }

    ///
    /// Removes a pending event from the event list without firing it.
    ///
    /// Returns whether the event was pending; cancelling an event that is
    /// not pending is a no-op.
    ///
    pub fn cancel(&mut self, event: &EventRef) -> bool {
        self.evt_list.erase(event)
    }

    // Statistics

    ///
    /// Puts a statistic under monitoring.
    ///
    /// After every firing the engine records the statistic's steady-state
    /// entry and checks its precision for the termination rule. If the
    /// engine is currently inside a run, the statistic is initialized for
    /// the running experiment. Re-registering a handle refreshes its
    /// steady-state note.
    ///
    pub fn register_statistic(&mut self, stat: StatRef) {
        let steady_state_seen = stat.borrow().steady_state_entered();

        if !self.end_of_sim {
            stat.borrow_mut().initialize_for_experiment();
        }

        if let Some(entry) = self.stats.iter_mut().find(|e| Rc::ptr_eq(&e.stat, &stat)) {
            entry.steady_state_seen = steady_state_seen;
        } else {
            self.stats.push(StatEntry {
                stat,
                steady_state_seen,
            });
        }
    }

    ///
    /// Removes a statistic from monitoring.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if the handle was never
    /// registered.
    ///
    pub fn unregister_statistic(&mut self, stat: &StatRef) -> Result<(), EngineError> {
        let len = self.stats.len();
        self.stats.retain(|entry| !Rc::ptr_eq(&entry.stat, stat));

        if self.stats.len() == len {
            return Err(EngineError::InvalidArgument(
                "statistic is not monitored".to_string(),
            ));
        }
        Ok(())
    }

    /// Removes all statistics from monitoring.
    pub fn clear_statistics(&mut self) {
        self.stats.clear();
    }

    /// Returns the number of monitored statistics.
    #[must_use]
    pub fn num_statistics(&self) -> usize {
        self.stats.len()
    }

    // Control

    ///
    /// Runs one event step, if the simulation has not ended and the event
    /// list is non-empty. Used for step-through debugging and tests, in
    /// combination with [`prepare_simulation`](Engine::prepare_simulation).
    ///
    pub fn advance(&mut self) {
        if !self.end_of_sim && !self.evt_list.is_empty() {
            self.fire_next_event();
            self.monitor_statistics();
        }
    }

    ///
    /// Schedules an END-OF-SIMULATION event at the given time, ending the
    /// run once it fires.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::LogicError`] if `time` lies in the past.
    ///
    pub fn stop_at_time(&mut self, time: SimTime) -> Result<(), EngineError> {
        if time < self.sim_time {
            return Err(EngineError::LogicError(format!(
                "cannot stop the simulation at a past time ({time} < {})",
                self.sim_time
            )));
        }

        let src = Rc::clone(&self.eos_src);
        self.schedule(&src, time);
        Ok(())
    }

    // Firing primitives, the building blocks of run policies.

    ///
    /// Resets the engine to the start of an experiment: clock and counters
    /// to zero, event list cleared, end-of-simulation flag lowered.
    ///
    /// Monitored statistics are not touched, so replication policies can
    /// carry their data across experiments.
    ///
    pub fn reset(&mut self) {
        self.sim_time = self.start_time;
        self.last_evt_time = self.start_time;

        self.num_events = 0;
        self.num_usr_events = 0;

        self.end_of_sim = false;

        self.evt_list.clear();
    }

    ///
    /// Prepares a fresh simulation: resets the engine state and every
    /// monitored statistic, then immediately fires BEGIN-OF-SIMULATION.
    ///
    pub fn prepare_simulation(&mut self) {
        self.reset();
        self.reset_statistics();

        let src = Rc::clone(&self.bos_src);
        self.fire_immediate(&src);
    }

    /// Immediately fires SYSTEM-INITIALIZATION to set up the simulated
    /// system for the next experiment.
    pub fn initialize_system(&mut self) {
        let src = Rc::clone(&self.si_src);
        self.fire_immediate(&src);
    }

    /// Immediately fires SYSTEM-FINALIZATION to tear down the simulated
    /// system after an experiment.
    pub fn finalize_system(&mut self) {
        let src = Rc::clone(&self.sf_src);
        self.fire_immediate(&src);
    }

    ///
    /// Finalizes the simulation: discards all pending events, immediately
    /// fires END-OF-SIMULATION and raises the end-of-simulation flag.
    ///
    pub fn finalize_simulation(&mut self) {
        self.evt_list.clear();

        let src = Rc::clone(&self.eos_src);
        self.fire_immediate(&src);

        self.end_of_sim = true;
    }

    ///
    /// Pops the earliest event from the event list and fires it, bracketed
    /// by the before/after sources and followed by the clock update.
    ///
    /// An event whose source was disabled after scheduling is discarded
    /// with a warning, without advancing the clock or the counters. A
    /// configured run limit ends the simulation instead of firing.
    ///
    pub fn fire_next_event(&mut self) {
        let Some(next_time) = self.evt_list.top().map(|event| event.fire_time()) else {
            return;
        };

        if self.limit.applies(self.num_events + 1, next_time) {
            self.end_of_sim = true;
            return;
        }

        let Some(event) = self.evt_list.pop() else {
            return;
        };
        debug_assert!(event.fire_time() >= self.sim_time);

        self.dispatch(&event);
    }

    ///
    /// Constructs an event with both scheduling and fire time equal to the
    /// current clock value and fires it, bypassing the event list.
    ///
    pub fn fire_immediate(&mut self, source: &SourceRef) {
        let event = Event::immediate(Rc::clone(source), self.sim_time, EventData::None);
        self.dispatch(&event);
    }

    /// Immediately fires an event carrying a payload,
    /// see [`fire_immediate`](Engine::fire_immediate).
    pub fn fire_immediate_with<T: Any>(&mut self, source: &SourceRef, payload: T) {
        let event = Event::immediate(
            Rc::clone(source),
            self.sim_time,
            EventData::Payload(Box::new(payload)),
        );
        self.dispatch(&event);
    }

    /// Fires an event: bracket before, the event itself, bracket after,
    /// then the clock bookkeeping.
    fn dispatch(&mut self, event: &EventRef) {
        if !event.source().enabled() {
            warn!(
                target: LOG_TARGET,
                "event {event} will not be fired since its source is disabled"
            );
            return;
        }

        self.sim_time = event.fire_time();

        self.num_events += 1;
        if !self.is_internal_event(event) {
            self.num_usr_events += 1;
        }

        if !self.bef_src.empty() {
            let bracket = Event::bracket(
                Rc::clone(&self.bef_src),
                self.sim_time,
                BracketKind::Before,
                Rc::clone(event),
            );
            self.fire(&bracket);
            self.num_events += 1;
        }

        self.fire(event);

        if !self.aef_src.empty() {
            let bracket = Event::bracket(
                Rc::clone(&self.aef_src),
                self.sim_time,
                BracketKind::After,
                Rc::clone(event),
            );
            self.fire(&bracket);
            self.num_events += 1;
        }

        self.last_evt_time = self.sim_time;

        if Rc::ptr_eq(event.source(), &self.eos_src) {
            self.end_of_sim = true;
        }
    }

    /// Invokes the sinks of the event's source with a fresh context.
    fn fire(&mut self, event: &EventRef) {
        let source = Rc::clone(event.source());
        let mut ctx = EngineContext::new(self);
        source.fire(event, &mut ctx);
    }

    /// Tells whether the event stems from one of the six engine-owned
    /// sources.
    #[must_use]
    pub fn is_internal_event(&self, event: &EventRef) -> bool {
        let src = event.source();
        Rc::ptr_eq(src, &self.bos_src)
            || Rc::ptr_eq(src, &self.eos_src)
            || Rc::ptr_eq(src, &self.bef_src)
            || Rc::ptr_eq(src, &self.aef_src)
            || Rc::ptr_eq(src, &self.si_src)
            || Rc::ptr_eq(src, &self.sf_src)
    }

    ///
    /// Walks the statistic registry after a firing: records first-time
    /// steady-state entries and applies the precision-based stop rule.
    ///
    /// If the registry is non-empty and every enabled statistic reports its
    /// target precision reached, the end-of-simulation flag is raised. The
    /// walk never short-circuits, every statistic still gets its
    /// steady-state entry time observed.
    ///
    pub fn monitor_statistics(&mut self) {
        if self.stats.is_empty() {
            return;
        }

        let now = self.sim_time;
        let mut prec_reached = true;

        for entry in &mut self.stats {
            let mut stat = entry.stat.borrow_mut();

            if !entry.steady_state_seen && stat.steady_state_entered() {
                entry.steady_state_seen = true;
                stat.steady_state_enter_time(now);
            }

            if stat.enabled() && !stat.target_precision_reached() {
                prec_reached = false;
                // No break, the remaining statistics still need their
                // steady-state entry recorded.
            }
        }

        if prec_reached {
            self.end_of_sim = true;
        }
    }

    /// Resets every monitored statistic and the engine's steady-state
    /// notes, for the start of a fresh simulation.
    pub fn reset_statistics(&mut self) {
        for entry in &mut self.stats {
            entry.stat.borrow_mut().reset();
            entry.steady_state_seen = false;
        }
    }

    /// Tells every monitored statistic to close the current experiment and
    /// start accumulating the next one.
    pub fn initialize_statistics_for_experiment(&mut self) {
        for entry in &mut self.stats {
            entry.stat.borrow_mut().initialize_for_experiment();
        }
    }

    /// Tells whether the registry is non-empty and every enabled statistic
    /// has reached its target precision.
    #[must_use]
    pub fn precision_reached(&self) -> bool {
        !self.stats.is_empty()
            && self.stats.iter().all(|entry| {
                let stat = entry.stat.borrow();
                !stat.enabled() || stat.target_precision_reached()
            })
    }

    /// Returns `(estimate, std deviation)` of the primary (first
    /// registered) statistic, if any.
    #[must_use]
    pub fn primary_statistic_summary(&self) -> Option<(f64, f64)> {
        self.stats.first().map(|entry| {
            let stat = entry.stat.borrow();
            (stat.mean(), stat.std_derivation())
        })
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Engine {{ sim_time: {} fired: {} ({} user) enqueued: {} eos: {} }}",
            self.sim_time,
            self.num_events,
            self.num_usr_events,
            self.evt_list.len(),
            self.end_of_sim
        )
    }
}
