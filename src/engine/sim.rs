use std::ops::{Deref, DerefMut};

use super::{Engine, EngineError, RunPolicy};
use crate::stats::{StatRef, Statistic};

///
/// A runnable simulation: an [`Engine`] paired with the [`RunPolicy`] that
/// drives it.
///
/// The simulation derefs to its engine, so the whole scheduling and
/// statistic API is available directly on it.
///
/// # Examples
///
/// ```
/// use desim::prelude::*;
///
/// let mut sim = Builder::new().quiet().build(SingleRun::default());
///
/// let ticks = EventSource::new("tick");
/// let tick_handle = ticks.clone();
/// sim.system_initialization_source().connect(move |_, ctx| {
///     for i in 1..=5 {
///         ctx.schedule(&tick_handle, SimTime::from(f64::from(i)));
///     }
/// });
///
/// sim.run().unwrap();
/// assert_eq!(sim.simulated_time(), SimTime::from(5.0));
/// assert!(sim.end_of_simulation());
/// ```
///
pub struct Simulation<P>
where
    P: RunPolicy,
{
    /// The contained run policy, holding strategy state such as replication
    /// detectors or batching parameters.
    pub policy: P,

    pub(crate) engine: Engine,
}

impl<P> Simulation<P>
where
    P: RunPolicy,
{
    /// Creates a simulation over a fresh engine. Use
    /// [`Builder`](super::Builder) to configure limits or quiet mode.
    #[must_use]
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            engine: Engine::new(),
        }
    }

    /// Returns the engine of this simulation.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns the engine of this simulation.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    ///
    /// Runs the simulation until the policy's stopping conditions are met
    /// or no events are left to be fired.
    ///
    /// # Errors
    ///
    /// Propagates any error of the run policy. On error the
    /// end-of-simulation flag is left as the policy left it; rerun only
    /// after an explicit [`prepare_simulation`](Engine::prepare_simulation)
    /// or with a fresh engine.
    ///
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.engine.end_of_sim = false;

        if !self.engine.quiet {
            println!("\u{23A1}");
            println!("\u{23A2} Simulation starting");
            println!("\u{23A2}  Limit := {}", self.engine.limit);
            println!("\u{23A3}");
        }

        self.engine.profiler.start();

        P::do_run(self)?;

        let event_count = self.engine.num_events;
        self.engine.profiler.finish(event_count);
        self.engine.end_of_sim = true;

        if !self.engine.quiet {
            println!("\u{23A1}");
            println!("\u{23A2} Simulation ended");
            println!(
                "\u{23A2}  Ended at event #{} after {}",
                self.engine.num_events, self.engine.sim_time
            );
            println!(
                "\u{23A2}  Took {:?} ({} events/s)",
                self.engine.profiler.duration,
                self.engine.profiler.throughput().floor()
            );
            println!("\u{23A3}");
        }

        Ok(())
    }

    ///
    /// Stops the simulation just now: the in-flight event completes, no
    /// further event is fired. END-OF-SIMULATION is fired by the policy's
    /// final [`finalize_simulation`](Engine::finalize_simulation), not here.
    ///
    pub fn stop_now(&mut self) {
        P::do_stop_now(self);
        self.engine.end_of_sim = true;
    }

    ///
    /// Wraps a plain statistic into the policy's analyzable form and puts
    /// it under monitoring.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unsupported`] if the policy has no
    /// output-analysis method.
    ///
    pub fn make_analyzable_statistic(
        &mut self,
        stat: impl Statistic<Value = f64> + 'static,
        target_relative_precision: f64,
    ) -> Result<StatRef, EngineError> {
        let stat =
            P::do_make_analyzable_statistic(self, Box::new(stat), target_relative_precision)?;
        self.engine.register_statistic(stat.clone());
        Ok(stat)
    }
}

impl<P> Deref for Simulation<P>
where
    P: RunPolicy,
{
    type Target = Engine;
    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

impl<P> DerefMut for Simulation<P>
where
    P: RunPolicy,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.engine
    }
}

impl<P> std::fmt::Debug for Simulation<P>
where
    P: RunPolicy,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Simulation<{}> {{ {:?} }}",
            std::any::type_name::<P>(),
            self.engine
        )
    }
}
