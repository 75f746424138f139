use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Display};
use std::rc::Rc;

use super::context::EngineContext;
use super::event::EventRef;

///
/// A shared handle to an event source.
///
/// Sources are compared by identity ([`Rc::ptr_eq`]), never by name.
///
pub type SourceRef = Rc<EventSource>;

/// A callable attached to an event source, invoked for every firing.
pub(crate) type SinkFn = dyn FnMut(&EventRef, &mut EngineContext<'_>);

/// An identifier for a connected sink, used to disconnect it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

struct SinkEntry {
    id: u64,
    sink: Rc<RefCell<SinkFn>>,
}

///
/// A named emission point for events.
///
/// A source owns an ordered list of sinks and an enabled flag. Firing an
/// event invokes every sink in connection order. Scheduling from a disabled
/// source is rejected, and an event whose source is disabled at fire time is
/// skipped.
///
/// The six engine-owned sources (begin/end of simulation, system
/// initialization/finalization, before/after event firing) are created by
/// [`Engine::new`](crate::engine::Engine::new); any further source is
/// created by user code via [`EventSource::new`].
///
pub struct EventSource {
    name: String,
    enabled: Cell<bool>,
    sinks: RefCell<Vec<SinkEntry>>,
    next_sink_id: Cell<u64>,
}

impl EventSource {
    /// Creates a new, enabled event source without sinks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> SourceRef {
        Rc::new(Self {
            name: name.into(),
            enabled: Cell::new(true),
            sinks: RefCell::new(Vec::new()),
            next_sink_id: Cell::new(0),
        })
    }

    /// Returns the human-readable name of this source.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tells whether this source currently fires events.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Allows this source to fire events again.
    pub fn enable(&self) {
        self.enabled.set(true);
    }

    /// Prevents this source from scheduling or firing events.
    pub fn disable(&self) {
        self.enabled.set(false);
    }

    /// Tells whether no sink is connected to this source.
    #[must_use]
    pub fn empty(&self) -> bool {
        self.sinks.borrow().is_empty()
    }

    ///
    /// Connects a sink to this source.
    ///
    /// Sinks fire in connection order. Connecting is allowed at any time,
    /// including from inside a firing sink; the addition takes effect on the
    /// next firing.
    ///
    pub fn connect(&self, sink: impl FnMut(&EventRef, &mut EngineContext<'_>) + 'static) -> SinkId {
        let id = self.next_sink_id.get();
        self.next_sink_id.set(id + 1);

        self.sinks.borrow_mut().push(SinkEntry {
            id,
            sink: Rc::new(RefCell::new(sink)),
        });
        SinkId(id)
    }

    ///
    /// Disconnects a previously connected sink.
    ///
    /// Returns whether the sink was still connected. Disconnecting from
    /// inside a firing sink takes effect on the next firing.
    ///
    pub fn disconnect(&self, id: SinkId) -> bool {
        let mut sinks = self.sinks.borrow_mut();
        let len = sinks.len();
        sinks.retain(|entry| entry.id != id.0);
        sinks.len() != len
    }

    ///
    /// Invokes every connected sink with the given event, in connection
    /// order.
    ///
    /// The sink list is snapshotted on entry, so mutations performed by the
    /// running sinks only affect subsequent firings.
    ///
    pub(crate) fn fire(&self, event: &EventRef, ctx: &mut EngineContext<'_>) {
        let snapshot: Vec<Rc<RefCell<SinkFn>>> = self
            .sinks
            .borrow()
            .iter()
            .map(|entry| Rc::clone(&entry.sink))
            .collect();

        for sink in snapshot {
            (&mut *sink.borrow_mut())(event, ctx);
        }
    }
}

impl Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("name", &self.name)
            .field("enabled", &self.enabled.get())
            .field("sinks", &self.sinks.borrow().len())
            .finish()
    }
}

impl Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
