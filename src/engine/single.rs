use super::{Engine, EngineError, RunPolicy, Simulation};
use crate::stats::{SampleAnalyzer, StatRef, Statistic};

///
/// The simplest run policy: one experiment from BEGIN-OF-SIMULATION to
/// END-OF-SIMULATION.
///
/// Statistics made analyzable through this policy treat every collected
/// value as an independent sample, see
/// [`SampleAnalyzer`](crate::stats::SampleAnalyzer).
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingleRun {
    /// Warm-up samples per statistic before steady state is assumed.
    pub warmup_samples: usize,
}

impl SingleRun {
    /// A single run whose statistics discard no warm-up samples.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single run whose statistics assume steady state only after the
    /// given number of samples.
    #[must_use]
    pub fn with_warmup(warmup_samples: usize) -> Self {
        Self { warmup_samples }
    }
}

/// Fires events and monitors statistics until the end of the simulation is
/// requested or the event list runs dry. The shared inner loop of every
/// experiment-shaped policy.
pub(crate) fn run_experiment(engine: &mut Engine) {
    while !engine.end_of_simulation() && engine.pending_events() > 0 {
        engine.fire_next_event();
        engine.monitor_statistics();
    }
}

impl RunPolicy for SingleRun {
    fn do_run(sim: &mut Simulation<Self>) -> Result<(), EngineError> {
        sim.engine.prepare_simulation();
        sim.engine.initialize_system();

        run_experiment(&mut sim.engine);

        sim.engine.finalize_system();
        sim.engine.finalize_simulation();
        Ok(())
    }

    fn do_make_analyzable_statistic(
        sim: &mut Simulation<Self>,
        stat: Box<dyn Statistic<Value = f64>>,
        target_relative_precision: f64,
    ) -> Result<StatRef, EngineError> {
        let analyzer =
            SampleAnalyzer::new(stat, target_relative_precision).warmup(sim.policy.warmup_samples);
        Ok(crate::stats::stat_ref(analyzer))
    }
}
