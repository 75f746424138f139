use std::fmt::Debug;

use super::{Engine, RunLimit, RunPolicy, Simulation};
use crate::time::SimTime;

/// A builder for a simulation instance.
#[must_use]
pub struct Builder {
    quiet: bool,
    limit: RunLimit,
    start_time: SimTime,
}

impl Builder {
    /// Creates a new unconfigured builder.
    pub fn new() -> Builder {
        Builder {
            quiet: false,
            limit: RunLimit::None,
            start_time: SimTime::MIN,
        }
    }

    ///
    /// Suppresses runtime messages from the simulation framework.
    ///
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    ///
    /// Changes the simulated time the clock starts on.
    ///
    pub fn start_time(mut self, time: SimTime) -> Self {
        self.start_time = time;
        self
    }

    ///
    /// Bounds the number of events a run may fire.
    ///
    pub fn max_itr(mut self, max_itr: usize) -> Self {
        self.limit.add(RunLimit::EventCount(max_itr));
        self
    }

    ///
    /// Bounds the simulated time a run may reach (default: inf).
    ///
    pub fn max_time(mut self, max_time: SimTime) -> Self {
        self.limit.add(RunLimit::SimTime(max_time));
        self
    }

    ///
    /// Adds a custom limit to the end of the run, combined with any
    /// `max_itr` and `max_time` options.
    ///
    pub fn limit(mut self, limit: RunLimit) -> Self {
        self.limit.add(limit);
        self
    }

    ///
    /// Builds a new [`Simulation`] instance over a fresh engine, driven by
    /// the given run policy.
    ///
    /// # Examples
    ///
    /// ```
    /// use desim::prelude::*;
    ///
    /// let mut sim = Builder::new()
    ///     .quiet()
    ///     .max_time(SimTime::from(100.0))
    ///     .build(SingleRun::default());
    ///
    /// sim.run().unwrap();
    /// ```
    pub fn build<P: RunPolicy>(self, policy: P) -> Simulation<P> {
        let mut engine = Engine::new();
        engine.quiet = self.quiet;
        engine.limit = self.limit;

        let mut sim = Simulation { policy, engine };
        sim.engine.set_start_time(self.start_time);
        sim
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("quiet", &self.quiet)
            .field("limit", &self.limit)
            .field("start_time", &self.start_time)
            .finish()
    }
}
