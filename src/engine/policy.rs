use super::{EngineError, Simulation};
use crate::stats::{StatRef, Statistic};

///
/// The top-level run strategy of a simulation.
///
/// A policy consumes the firing primitives of the [`Engine`](super::Engine)
/// to implement one complete execution: a single experiment, a sequence of
/// independent replications, one long batch-means run, or any custom
/// strategy. The public [`Simulation::run`] brackets
/// [`do_run`](RunPolicy::do_run) by lowering and raising the
/// end-of-simulation flag.
///
/// Policy state lives on the implementing type and is reachable through
/// [`Simulation::policy`] while the engine drives it, mirroring how an
/// application owns its state next to the scheduler.
///
pub trait RunPolicy: Sized {
    ///
    /// Executes the run strategy on the given simulation.
    ///
    /// Implementations are expected to end with
    /// [`finalize_simulation`](super::Engine::finalize_simulation) so that
    /// END-OF-SIMULATION fires exactly once per run.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy determines that the run failed as a
    /// whole. The error is propagated unchanged to [`Simulation::run`].
    ///
    fn do_run(sim: &mut Simulation<Self>) -> Result<(), EngineError>;

    ///
    /// A hook invoked by [`Simulation::stop_now`] before the
    /// end-of-simulation flag is raised. The default does nothing; a policy
    /// may instead schedule an END-OF-SIMULATION event of its own.
    ///
    #[allow(unused_variables)]
    fn do_stop_now(sim: &mut Simulation<Self>) {}

    ///
    /// Wraps a plain statistic into the analyzable form matching this
    /// policy's output-analysis method.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unsupported`] if the policy has no
    /// output-analysis method, as the default implementation does.
    ///
    #[allow(unused_variables)]
    fn do_make_analyzable_statistic(
        sim: &mut Simulation<Self>,
        stat: Box<dyn Statistic<Value = f64>>,
        target_relative_precision: f64,
    ) -> Result<StatRef, EngineError> {
        Err(EngineError::Unsupported(
            "this run policy does not provide an output analysis method".to_string(),
        ))
    }
}
