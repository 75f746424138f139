use std::any::Any;

use super::event::EventRef;
use super::source::SourceRef;
use super::Engine;
use crate::time::SimTime;

///
/// A transient view of the engine, handed to every sink during a firing.
///
/// The context exposes read access to the clock state and a narrow mutation
/// API restricted to scheduling: a sink may insert, retime or cancel events,
/// but it cannot re-enter the firing loop of its own engine.
///
pub struct EngineContext<'a> {
    engine: &'a mut Engine,
}

impl<'a> EngineContext<'a> {
    pub(crate) fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }

    /// Returns the simulated time, equal to the fire time of the event
    /// currently being fired.
    #[must_use]
    pub fn simulated_time(&self) -> SimTime {
        self.engine.simulated_time()
    }

    /// Returns the simulated time of the last completed firing.
    #[must_use]
    pub fn last_event_time(&self) -> SimTime {
        self.engine.last_event_time()
    }

    /// Tells whether the end of the simulation has been requested.
    #[must_use]
    pub fn end_of_simulation(&self) -> bool {
        self.engine.end_of_simulation()
    }

    /// Schedules a new event, see [`Engine::schedule`].
    pub fn schedule(&mut self, source: &SourceRef, time: SimTime) -> Option<EventRef> {
        self.engine.schedule(source, time)
    }

    /// Schedules a new event with a payload, see [`Engine::schedule_with`].
    pub fn schedule_with<T: Any>(
        &mut self,
        source: &SourceRef,
        time: SimTime,
        payload: T,
    ) -> Option<EventRef> {
        self.engine.schedule_with(source, time, payload)
    }

    /// Moves a pending event to a new fire time, see [`Engine::reschedule`].
    pub fn reschedule(&mut self, event: &EventRef, time: SimTime) {
        self.engine.reschedule(event, time);
    }

    /// Removes a pending event without firing it, see [`Engine::cancel`].
    pub fn cancel(&mut self, event: &EventRef) -> bool {
        self.engine.cancel(event)
    }
}
