//! Output-analysis wrappers that make plain statistics analyzable.
//!
//! An analyzer owns an inner estimator (any [`Statistic`] over `f64`, e.g.
//! [`StdDev`](crate::stats::StdDev)) and adds the termination contract the
//! engine consumes: steady-state tracking and a confidence-interval based
//! relative precision. One analyzer exists per output-analysis method; the
//! matching run policy picks it in its statistic factory.

use super::{AnalyzableStatistic, Statistic, StdDev};
use crate::time::SimTime;

/// The default normal quantile, a 95% confidence level.
pub const DEFAULT_Z: f64 = 1.96;

/// Half-width of the confidence interval for a sample of size `n`.
fn half_width(z: f64, std_derivation: f64, n: usize) -> f64 {
    if n < 2 {
        f64::INFINITY
    } else {
        z * std_derivation / (n as f64).sqrt()
    }
}

/// Relative precision: CI half-width over the magnitude of the estimate.
fn relative_precision(z: f64, mean: f64, std_derivation: f64, n: usize) -> f64 {
    let hw = half_width(z, std_derivation, n);
    if mean == 0.0 {
        if hw == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        hw / mean.abs()
    }
}

///
/// An analyzer for a single simulation experiment.
///
/// Every collected value counts as one independent sample; the relative
/// precision is the CI half-width over the sample mean. Steady state is
/// entered after a configurable warm-up number of samples.
///
pub struct SampleAnalyzer {
    inner: Box<dyn Statistic<Value = f64>>,
    target: f64,
    z: f64,
    warmup: usize,
    enabled: bool,
    steady_enter_time: Option<SimTime>,
}

impl SampleAnalyzer {
    /// Creates an analyzer over `inner` with the given target relative
    /// precision.
    #[must_use]
    pub fn new(inner: Box<dyn Statistic<Value = f64>>, target_relative_precision: f64) -> Self {
        Self {
            inner,
            target: target_relative_precision,
            z: DEFAULT_Z,
            warmup: 0,
            enabled: true,
            steady_enter_time: None,
        }
    }

    /// Sets the number of warm-up samples observed before steady state.
    #[must_use]
    pub fn warmup(mut self, samples: usize) -> Self {
        self.warmup = samples;
        self
    }

    /// Sets the normal quantile used for the confidence interval.
    #[must_use]
    pub fn quantile(mut self, z: f64) -> Self {
        self.z = z;
        self
    }

    /// Starts or stops the accumulation of datapoints.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns the recorded steady-state entry time, if any.
    #[must_use]
    pub fn steady_state_time(&self) -> Option<SimTime> {
        self.steady_enter_time
    }
}

impl Statistic for SampleAnalyzer {
    type Value = f64;

    fn collect_weighted_at(&mut self, value: f64, weight: f64, sim_time: SimTime) {
        if self.enabled {
            self.inner.collect_weighted_at(value, weight, sim_time);
        }
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
    fn sum(&self) -> f64 {
        self.inner.sum()
    }
    fn sqrtsum(&self) -> f64 {
        self.inner.sqrtsum()
    }
    fn min(&self) -> f64 {
        self.inner.min()
    }
    fn max(&self) -> f64 {
        self.inner.max()
    }
    fn mean(&self) -> f64 {
        self.inner.mean()
    }
    fn std_derivation(&self) -> f64 {
        self.inner.std_derivation()
    }
    fn variance(&self) -> f64 {
        self.inner.variance()
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.steady_enter_time = None;
    }
}

impl AnalyzableStatistic for SampleAnalyzer {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn steady_state_entered(&self) -> bool {
        self.inner.len() >= self.warmup
    }

    fn steady_state_enter_time(&mut self, time: SimTime) {
        self.steady_enter_time = Some(time);
    }

    fn relative_precision(&self) -> f64 {
        relative_precision(
            self.z,
            self.inner.mean(),
            self.inner.std_derivation(),
            self.inner.len(),
        )
    }

    fn target_relative_precision(&self) -> f64 {
        self.target
    }

    fn initialize_for_experiment(&mut self) {
        self.inner.reset();
    }
}

///
/// An analyzer for independent replications.
///
/// Observations are accumulated per replication;
/// [`initialize_for_experiment`](AnalyzableStatistic::initialize_for_experiment)
/// closes the running replication by pushing its mean into an
/// across-replication accumulator and starts the next one. The reported
/// estimate and the precision are computed over the replication means.
///
pub struct ReplicationAnalyzer {
    inner: Box<dyn Statistic<Value = f64>>,
    replications: StdDev,
    target: f64,
    z: f64,
    warmup: usize,
    enabled: bool,
    steady_enter_time: Option<SimTime>,
}

impl ReplicationAnalyzer {
    /// Creates an analyzer over `inner` with the given target relative
    /// precision across replication means.
    #[must_use]
    pub fn new(inner: Box<dyn Statistic<Value = f64>>, target_relative_precision: f64) -> Self {
        Self {
            inner,
            replications: StdDev::new(),
            target: target_relative_precision,
            z: DEFAULT_Z,
            warmup: 0,
            enabled: true,
            steady_enter_time: None,
        }
    }

    /// Sets the number of warm-up samples per replication.
    #[must_use]
    pub fn warmup(mut self, samples: usize) -> Self {
        self.warmup = samples;
        self
    }

    /// Starts or stops the accumulation of datapoints.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns the number of completed replications.
    #[must_use]
    pub fn num_replications(&self) -> usize {
        self.replications.len()
    }

    /// Returns the recorded steady-state entry time, if any.
    #[must_use]
    pub fn steady_state_time(&self) -> Option<SimTime> {
        self.steady_enter_time
    }
}

impl Statistic for ReplicationAnalyzer {
    type Value = f64;

    fn collect_weighted_at(&mut self, value: f64, weight: f64, sim_time: SimTime) {
        if self.enabled {
            self.inner.collect_weighted_at(value, weight, sim_time);
        }
    }

    // The reported moments describe the across-replication estimator.

    fn len(&self) -> usize {
        self.replications.len()
    }
    fn sum(&self) -> f64 {
        self.replications.sum()
    }
    fn sqrtsum(&self) -> f64 {
        self.replications.sqrtsum()
    }
    fn min(&self) -> f64 {
        self.replications.min()
    }
    fn max(&self) -> f64 {
        self.replications.max()
    }
    fn mean(&self) -> f64 {
        self.replications.mean()
    }
    fn std_derivation(&self) -> f64 {
        self.replications.std_derivation()
    }
    fn variance(&self) -> f64 {
        self.replications.variance()
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.replications.clear();
        self.steady_enter_time = None;
    }
}

impl AnalyzableStatistic for ReplicationAnalyzer {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn steady_state_entered(&self) -> bool {
        self.inner.len() >= self.warmup
    }

    fn steady_state_enter_time(&mut self, time: SimTime) {
        self.steady_enter_time = Some(time);
    }

    fn relative_precision(&self) -> f64 {
        relative_precision(
            self.z,
            self.replications.mean(),
            self.replications.std_derivation(),
            self.replications.len(),
        )
    }

    fn target_relative_precision(&self) -> f64 {
        self.target
    }

    fn initialize_for_experiment(&mut self) {
        if !self.inner.is_empty() {
            self.replications.collect_at(self.inner.mean(), SimTime::ZERO);
            self.inner.reset();
        }
    }
}

///
/// An analyzer for the batch-means method.
///
/// A single long run is internally partitioned into fixed-size batches; the
/// first few batches can be discarded as the warm-up transient. Estimate
/// and precision are computed over the batch means, the engine contract is
/// the same as for any other analyzer.
///
pub struct BatchMeansAnalyzer {
    current: Box<dyn Statistic<Value = f64>>,
    batches: StdDev,
    batch_size: usize,
    discard: usize,
    discarded: usize,
    target: f64,
    z: f64,
    enabled: bool,
    steady_enter_time: Option<SimTime>,
}

impl BatchMeansAnalyzer {
    /// Creates an analyzer collecting batches through `inner`, with the
    /// given batch size and target relative precision across batch means.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    #[must_use]
    pub fn new(
        inner: Box<dyn Statistic<Value = f64>>,
        batch_size: usize,
        target_relative_precision: f64,
    ) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        Self {
            current: inner,
            batches: StdDev::new(),
            batch_size,
            discard: 0,
            discarded: 0,
            target: target_relative_precision,
            z: DEFAULT_Z,
            enabled: true,
            steady_enter_time: None,
        }
    }

    /// Sets the number of initial batches dropped as warm-up transient.
    #[must_use]
    pub fn discard(mut self, batches: usize) -> Self {
        self.discard = batches;
        self
    }

    /// Starts or stops the accumulation of datapoints.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns the number of completed, non-discarded batches.
    #[must_use]
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    /// Returns the recorded steady-state entry time, if any.
    #[must_use]
    pub fn steady_state_time(&self) -> Option<SimTime> {
        self.steady_enter_time
    }

    fn flush_batch(&mut self, sim_time: SimTime) {
        let mean = self.current.mean();
        if self.discarded < self.discard {
            self.discarded += 1;
        } else {
            self.batches.collect_at(mean, sim_time);
        }
        self.current.reset();
    }
}

impl Statistic for BatchMeansAnalyzer {
    type Value = f64;

    fn collect_weighted_at(&mut self, value: f64, weight: f64, sim_time: SimTime) {
        if !self.enabled {
            return;
        }
        self.current.collect_weighted_at(value, weight, sim_time);
        if self.current.len() >= self.batch_size {
            self.flush_batch(sim_time);
        }
    }

    fn len(&self) -> usize {
        self.batches.len()
    }
    fn sum(&self) -> f64 {
        self.batches.sum()
    }
    fn sqrtsum(&self) -> f64 {
        self.batches.sqrtsum()
    }
    fn min(&self) -> f64 {
        self.batches.min()
    }
    fn max(&self) -> f64 {
        self.batches.max()
    }
    fn mean(&self) -> f64 {
        self.batches.mean()
    }
    fn std_derivation(&self) -> f64 {
        self.batches.std_derivation()
    }
    fn variance(&self) -> f64 {
        self.batches.variance()
    }

    fn reset(&mut self) {
        self.current.reset();
        self.batches.clear();
        self.discarded = 0;
        self.steady_enter_time = None;
    }
}

impl AnalyzableStatistic for BatchMeansAnalyzer {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn steady_state_entered(&self) -> bool {
        self.discarded >= self.discard
    }

    fn steady_state_enter_time(&mut self, time: SimTime) {
        self.steady_enter_time = Some(time);
    }

    fn relative_precision(&self) -> f64 {
        relative_precision(
            self.z,
            self.batches.mean(),
            self.batches.std_derivation(),
            self.batches.len(),
        )
    }

    fn target_relative_precision(&self) -> f64 {
        self.target
    }

    fn initialize_for_experiment(&mut self) {
        self.current.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_analyzer_reaches_precision_on_stable_data() {
        let mut stat = SampleAnalyzer::new(Box::new(StdDev::new()), 0.05);
        assert!(!stat.target_precision_reached());

        for i in 0..100 {
            let noise = if i % 2 == 0 { 0.01 } else { -0.01 };
            stat.collect_at(10.0 + noise, SimTime::from(i as f64));
        }
        assert!(stat.relative_precision() < 0.05);
        assert!(stat.target_precision_reached());
    }

    #[test]
    fn sample_analyzer_warmup_gates_steady_state() {
        let mut stat = SampleAnalyzer::new(Box::new(StdDev::new()), 0.05).warmup(3);
        assert!(!stat.steady_state_entered());

        for i in 0..3 {
            stat.collect_at(1.0, SimTime::from(i as f64));
        }
        assert!(stat.steady_state_entered());
    }

    #[test]
    fn disabled_analyzer_ignores_datapoints() {
        let mut stat = SampleAnalyzer::new(Box::new(StdDev::new()), 0.05);
        stat.set_enabled(false);
        stat.collect_at(1.0, SimTime::ZERO);
        assert!(stat.is_empty());
    }

    #[test]
    fn replication_analyzer_closes_experiments() {
        let mut stat = ReplicationAnalyzer::new(Box::new(StdDev::new()), 0.05);

        for mean in [10.0, 12.0, 11.0] {
            stat.collect_at(mean - 1.0, SimTime::ZERO);
            stat.collect_at(mean + 1.0, SimTime::ZERO);
            stat.initialize_for_experiment();
        }

        assert_eq!(stat.num_replications(), 3);
        assert!((stat.mean() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn replication_analyzer_ignores_empty_experiments() {
        let mut stat = ReplicationAnalyzer::new(Box::new(StdDev::new()), 0.05);
        stat.initialize_for_experiment();
        assert_eq!(stat.num_replications(), 0);
    }

    #[test]
    fn batch_means_partitions_and_discards() {
        let mut stat = BatchMeansAnalyzer::new(Box::new(StdDev::new()), 5, 0.05).discard(1);
        assert!(!stat.steady_state_entered());

        for i in 0..25 {
            stat.collect_at(f64::from(i % 5), SimTime::from(f64::from(i)));
        }

        // 5 completed batches, the first one discarded.
        assert_eq!(stat.num_batches(), 4);
        assert!(stat.steady_state_entered());
        assert!((stat.mean() - 2.0).abs() < 1e-9);
    }
}
