use log::warn;

use super::single::run_experiment;
use super::{EngineError, RunPolicy, Simulation, LOG_TARGET};
use crate::stats::{ReplicationAnalyzer, StatRef, Statistic};

///
/// A policy deciding how many independent replications a simulation needs.
///
/// After every replication the engine feeds the detector with the current
/// replication count and the running estimate of the primary statistic. The
/// run stops once the detector has settled on a number and that many
/// replications have completed.
///
pub trait ReplicationsDetector {
    /// Observes the state after a replication. Returns whether the number
    /// of required replications has been detected.
    fn detect(&mut self, r_cur: usize, estimate: f64, stddev: f64) -> bool;

    /// Tells whether the number of required replications is known.
    fn detected(&self) -> bool;

    /// Tells whether the detector gave up, e.g. because the estimate will
    /// not stabilize within its bounds.
    fn aborted(&self) -> bool;

    /// Returns the detected (or configured) number of replications.
    fn estimated_number(&self) -> usize;

    /// Returns the detector to its initial state.
    fn reset(&mut self);
}

///
/// A detector with a prescribed number of replications.
///
/// Always detected, never aborted. The default number is unbounded, which
/// leaves termination entirely to the precision-based stop rule.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantReplicationsDetector {
    r: usize,
}

impl ConstantReplicationsDetector {
    /// The default number of replications, effectively unbounded.
    pub const DEFAULT_NUM_REPLICATIONS: usize = usize::MAX;

    /// Creates a detector prescribing exactly `num_replications` runs.
    #[must_use]
    pub fn new(num_replications: usize) -> Self {
        Self {
            r: num_replications,
        }
    }
}

impl Default for ConstantReplicationsDetector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_NUM_REPLICATIONS)
    }
}

impl ReplicationsDetector for ConstantReplicationsDetector {
    fn detect(&mut self, _r_cur: usize, _estimate: f64, _stddev: f64) -> bool {
        true
    }

    fn detected(&self) -> bool {
        true
    }

    fn aborted(&self) -> bool {
        false
    }

    fn estimated_number(&self) -> usize {
        self.r
    }

    fn reset(&mut self) {}
}

///
/// A detector that estimates the required number of replications from the
/// observed variability of the estimate.
///
/// Inverts the confidence-interval half-width: to reach a relative
/// precision of `target` the run needs roughly `(z * s / (target * x̄))²`
/// replications. The detector aborts once `max_replications` is exceeded
/// without reaching a stable answer.
///
#[derive(Debug, Clone, PartialEq)]
pub struct RelativePrecisionDetector {
    target: f64,
    z: f64,
    max_replications: usize,

    detected: bool,
    aborted: bool,
    estimate: usize,
}

impl RelativePrecisionDetector {
    /// Creates a detector targeting the given relative precision.
    #[must_use]
    pub fn new(target_relative_precision: f64, max_replications: usize) -> Self {
        Self {
            target: target_relative_precision,
            z: crate::stats::DEFAULT_Z,
            max_replications,

            detected: false,
            aborted: false,
            estimate: max_replications,
        }
    }
}

impl ReplicationsDetector for RelativePrecisionDetector {
    fn detect(&mut self, r_cur: usize, estimate: f64, stddev: f64) -> bool {
        if r_cur < 2 {
            return false;
        }

        if estimate == 0.0 || !estimate.is_finite() || !stddev.is_finite() {
            if r_cur >= self.max_replications {
                self.aborted = true;
            }
            return false;
        }

        let required = (self.z * stddev / (self.target * estimate)).powi(2).ceil();

        if required >= self.max_replications as f64 {
            // The estimate will not stabilize within the bound.
            self.estimate = self.max_replications;
            if r_cur >= self.max_replications {
                self.aborted = true;
            }
            return false;
        }

        self.estimate = (required as usize).max(2);
        if r_cur >= self.estimate {
            self.detected = true;
        }
        self.detected
    }

    fn detected(&self) -> bool {
        self.detected
    }

    fn aborted(&self) -> bool {
        self.aborted
    }

    fn estimated_number(&self) -> usize {
        self.estimate
    }

    fn reset(&mut self) {
        self.detected = false;
        self.aborted = false;
        self.estimate = self.max_replications;
    }
}

///
/// The independent-replications run policy.
///
/// BEGIN-OF-SIMULATION fires once, then the single-run body repeats: every
/// replication is bracketed by SYSTEM-INITIALIZATION and
/// SYSTEM-FINALIZATION over a reset clock and event list. Between
/// replications the monitored statistics are not reset; they are told
/// [`initialize_for_experiment`](crate::stats::AnalyzableStatistic::initialize_for_experiment),
/// which closes the finished replication and starts the next. The run stops
/// when the detector settles or every statistic reaches its precision, and
/// ends with a single END-OF-SIMULATION.
///
pub struct IndependentReplications {
    /// The detector deciding the number of replications.
    pub detector: Box<dyn ReplicationsDetector>,
    /// Warm-up samples per replication for statistics created through
    /// [`Simulation::make_analyzable_statistic`].
    pub warmup_samples: usize,
}

impl IndependentReplications {
    /// A replications run driven by the given detector.
    #[must_use]
    pub fn new(detector: impl ReplicationsDetector + 'static) -> Self {
        Self {
            detector: Box::new(detector),
            warmup_samples: 0,
        }
    }

    /// A replications run with a fixed number of replications.
    #[must_use]
    pub fn fixed(num_replications: usize) -> Self {
        Self::new(ConstantReplicationsDetector::new(num_replications))
    }
}

impl RunPolicy for IndependentReplications {
    fn do_run(sim: &mut Simulation<Self>) -> Result<(), EngineError> {
        sim.policy.detector.reset();
        sim.engine.prepare_simulation();

        let mut replication = 0;
        loop {
            if replication > 0 {
                sim.engine.reset();
            }
            sim.engine.initialize_system();

            run_experiment(&mut sim.engine);

            sim.engine.finalize_system();
            sim.engine.initialize_statistics_for_experiment();
            replication += 1;

            if sim.engine.precision_reached() {
                break;
            }

            let (estimate, stddev) = sim.engine.primary_statistic_summary().unwrap_or((0.0, 0.0));
            sim.policy.detector.detect(replication, estimate, stddev);

            if sim.policy.detector.aborted() {
                warn!(
                    target: LOG_TARGET,
                    "replications detector aborted after {replication} replications"
                );
                break;
            }
            if sim.policy.detector.detected()
                && replication >= sim.policy.detector.estimated_number()
            {
                break;
            }

            if sim.engine.num_statistics() == 0
                && sim.policy.detector.estimated_number() == usize::MAX
            {
                warn!(
                    target: LOG_TARGET,
                    "unbounded replications without monitored statistics, stopping after the first replication"
                );
                break;
            }
        }

        sim.engine.finalize_simulation();
        Ok(())
    }

    fn do_make_analyzable_statistic(
        sim: &mut Simulation<Self>,
        stat: Box<dyn Statistic<Value = f64>>,
        target_relative_precision: f64,
    ) -> Result<StatRef, EngineError> {
        let analyzer = ReplicationAnalyzer::new(stat, target_relative_precision)
            .warmup(sim.policy.warmup_samples);
        Ok(crate::stats::stat_ref(analyzer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_detector_is_always_detected() {
        let mut detector = ConstantReplicationsDetector::new(5);
        assert!(detector.detect(1, 0.0, 0.0));
        assert!(detector.detected());
        assert!(!detector.aborted());
        assert_eq!(detector.estimated_number(), 5);
    }

    #[test]
    fn precision_detector_settles_on_stable_estimates() {
        let mut detector = RelativePrecisionDetector::new(0.5, 100);
        assert!(!detector.detect(1, 10.0, 1.0));

        // n_req = (1.96 * 1 / (0.5 * 10))^2 = 0.15 -> clamped to 2.
        assert!(detector.detect(2, 10.0, 1.0));
        assert!(detector.detected());
        assert_eq!(detector.estimated_number(), 2);
    }

    #[test]
    fn precision_detector_aborts_at_bound() {
        let mut detector = RelativePrecisionDetector::new(1e-9, 3);
        detector.detect(2, 10.0, 5.0);
        assert!(!detector.detected());
        detector.detect(3, 10.0, 5.0);
        assert!(detector.aborted());

        detector.reset();
        assert!(!detector.aborted());
    }
}
