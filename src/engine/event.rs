use std::any::Any;
use std::cell::Cell;
use std::fmt::{Debug, Display};
use std::rc::Rc;

use super::source::SourceRef;
use crate::time::SimTime;

///
/// A shared handle to a scheduled event.
///
/// The event list and any subscriber that scheduled the event hold the same
/// allocation; the handle stays valid across reschedules and can be passed
/// back to the engine to retime or cancel the firing. Identity is pointer
/// identity, two distinct events with identical times are distinguishable.
///
pub type EventRef = Rc<Event>;

/// Which side of a bracketed firing an internal bracket event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BracketKind {
    /// Fired just before the bracketed event.
    Before,
    /// Fired just after the bracketed event.
    After,
}

/// The data slot of an event.
pub(crate) enum EventData {
    /// A plain event without attached state.
    None,
    /// A user supplied, type-erased payload.
    Payload(Box<dyn Any>),
    /// A bracket descriptor, carrying the event being bracketed.
    /// Bracket events are transient and never enter the event list.
    Bracket { kind: BracketKind, inner: EventRef },
}

///
/// A single scheduled firing: the source that will fire it, the clock value
/// at which it was inserted and the clock value at which it will fire.
///
/// Events are immutable after construction, except for the fire time, which
/// the engine may rewrite through [`reschedule`](crate::engine::Engine::reschedule).
///
pub struct Event {
    source: SourceRef,
    schedule_time: SimTime,
    fire_time: Cell<SimTime>,
    data: EventData,

    /// Sequence number of the live entry in the event list, if any.
    /// Managed exclusively by the event list.
    pub(crate) queue_token: Cell<Option<u64>>,
}

impl Event {
    pub(crate) fn new_scheduled(
        source: SourceRef,
        schedule_time: SimTime,
        fire_time: SimTime,
        data: EventData,
    ) -> EventRef {
        Rc::new(Self {
            source,
            schedule_time,
            fire_time: Cell::new(fire_time),
            data,
            queue_token: Cell::new(None),
        })
    }

    /// An event fired at the current clock value, bypassing the event list.
    pub(crate) fn immediate(source: SourceRef, now: SimTime, data: EventData) -> EventRef {
        Self::new_scheduled(source, now, now, data)
    }

    /// A transient bracket event embedding the event it brackets.
    pub(crate) fn bracket(
        source: SourceRef,
        now: SimTime,
        kind: BracketKind,
        inner: EventRef,
    ) -> EventRef {
        Self::new_scheduled(source, now, now, EventData::Bracket { kind, inner })
    }

    /// Returns the source this event will be fired by.
    #[must_use]
    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Returns the clock value at which this event was scheduled.
    #[must_use]
    pub fn schedule_time(&self) -> SimTime {
        self.schedule_time
    }

    /// Returns the clock value at which this event will fire (or fired).
    #[must_use]
    pub fn fire_time(&self) -> SimTime {
        self.fire_time.get()
    }

    pub(crate) fn set_fire_time(&self, time: SimTime) {
        self.fire_time.set(time);
    }

    /// Returns the attached payload, downcast to `T`.
    ///
    /// Returns `None` if the event carries no payload or a payload of a
    /// different type.
    #[must_use]
    pub fn payload<T: 'static>(&self) -> Option<&T> {
        match &self.data {
            EventData::Payload(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// For bracket events, tells which side of the firing this is.
    #[must_use]
    pub fn bracket_kind(&self) -> Option<BracketKind> {
        match &self.data {
            EventData::Bracket { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// For bracket events, returns the event being bracketed.
    #[must_use]
    pub fn bracketed(&self) -> Option<&EventRef> {
        match &self.data {
            EventData::Bracket { inner, .. } => Some(inner),
            _ => None,
        }
    }
}

impl Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("source", &self.source.name())
            .field("schedule_time", &self.schedule_time)
            .field("fire_time", &self.fire_time.get())
            .finish_non_exhaustive()
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<{} @ {} (scheduled @ {})>",
            self.source.name(),
            self.fire_time.get(),
            self.schedule_time
        )
    }
}
