use super::single::run_experiment;
use super::{EngineError, RunPolicy, Simulation};
use crate::stats::{BatchMeansAnalyzer, StatRef, Statistic};

///
/// The batch-means run policy.
///
/// Executes one long experiment exactly like [`SingleRun`](super::SingleRun);
/// the statistics created through this policy internally partition the
/// timeline into fixed-size batches and estimate their precision over the
/// batch means, see [`BatchMeansAnalyzer`](crate::stats::BatchMeansAnalyzer).
/// The engine's contract towards the statistics is unchanged.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMeans {
    /// Number of observations per batch.
    pub batch_size: usize,
    /// Number of initial batches discarded as warm-up transient.
    pub discard_batches: usize,
}

impl BatchMeans {
    /// A batch-means run with the given batch size, discarding no batches.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            discard_batches: 0,
        }
    }

    /// Sets the number of initial batches dropped as warm-up transient.
    #[must_use]
    pub fn discard(mut self, batches: usize) -> Self {
        self.discard_batches = batches;
        self
    }
}

impl Default for BatchMeans {
    fn default() -> Self {
        Self::new(32)
    }
}

impl RunPolicy for BatchMeans {
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
        let analyzer = BatchMeansAnalyzer::new(
            stat,
            sim.policy.batch_size,
            target_relative_precision,
        )
        .discard(sim.policy.discard_batches);
        Ok(crate::stats::stat_ref(analyzer))
    }
}
