//!
//! A set of traits and structs that help with the collection and analysis
//! of statistical data inside a simulation.
//!
#![allow(clippy::cast_precision_loss)]

use std::cell::RefCell;
use std::rc::Rc;

use crate::time::SimTime;

mod stddev;
pub use stddev::*;

mod analyzer;
pub use analyzer::*;

///
/// A type that allows for statistical data collection
/// inside a given simulation.
///
pub trait Statistic {
    ///
    /// The type of values that should be collected by
    /// this statistic.
    ///
    type Value;

    ///
    /// Collects a datapoint at a given time with a given weight.
    /// This function is required since it is the core of the data collection.
    ///
    fn collect_weighted_at(&mut self, value: Self::Value, weight: f64, sim_time: SimTime);

    ///
    /// Collects a non-weighted (w=1) datapoint at a given time.
    ///
    fn collect_at(&mut self, value: Self::Value, sim_time: SimTime) {
        self.collect_weighted_at(value, 1.0, sim_time);
    }

    /// Indicates whether the statistical object has received any datapoints.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of datapoints used in the statistical object.
    fn len(&self) -> usize;

    /// Returns the sum of all datapoints.
    fn sum(&self) -> Self::Value;

    /// Returns the squared sum of all datapoints.
    fn sqrtsum(&self) -> Self::Value;

    /// Returns the smallest datapoint.
    fn min(&self) -> Self::Value;

    /// Returns the biggest datapoint.
    fn max(&self) -> Self::Value;

    /// Returns the mean of all datapoints.
    fn mean(&self) -> Self::Value;

    /// Returns the standard derivation.
    fn std_derivation(&self) -> Self::Value;

    /// Returns the variance of all datapoints.
    fn variance(&self) -> Self::Value;

    /// Drops all collected datapoints, returning to the initial state.
    fn reset(&mut self);
}

///
/// The capability an engine requires of every statistic it monitors.
///
/// The engine never inspects an implementation beyond this contract: after
/// every firing it asks each registered statistic whether it has entered
/// steady state (recording the entry time exactly once) and whether its
/// target precision has been reached. Once every enabled statistic reports
/// its precision reached, the run terminates.
///
pub trait AnalyzableStatistic: Statistic<Value = f64> {
    /// Tells whether this statistic is currently accumulating datapoints.
    /// A disabled statistic does not prevent termination.
    fn enabled(&self) -> bool;

    /// Tells whether enough data has been observed to consider the warm-up
    /// transient exhausted.
    fn steady_state_entered(&self) -> bool;

    /// Records the simulated time at which steady state was entered. Called
    /// exactly once by the engine, at the first firing after
    /// [`steady_state_entered`](AnalyzableStatistic::steady_state_entered)
    /// first reports `true`.
    fn steady_state_enter_time(&mut self, time: SimTime);

    /// Tells whether the relative precision has fallen below its target.
    fn target_precision_reached(&self) -> bool {
        self.relative_precision() <= self.target_relative_precision()
    }

    /// Returns the current relative precision of the estimate, i.e. the
    /// half-width of the confidence interval over the magnitude of the
    /// estimate. Infinite while too little data has been collected.
    fn relative_precision(&self) -> f64;

    /// Returns the relative precision at which the estimate is considered
    /// accurate enough to terminate the run.
    fn target_relative_precision(&self) -> f64;

    /// Closes the current experiment and prepares accumulation for the next
    /// one, without discarding the data collected so far.
    fn initialize_for_experiment(&mut self);
}

///
/// A shared handle to a monitored statistic.
///
/// The registry of an engine is keyed by handle identity, so the same
/// allocation must be used for registration and deregistration.
///
pub type StatRef = Rc<RefCell<dyn AnalyzableStatistic>>;

/// Wraps an analyzable statistic into a sharable [`StatRef`] handle.
pub fn stat_ref(stat: impl AnalyzableStatistic + 'static) -> StatRef {
    Rc::new(RefCell::new(stat))
}
