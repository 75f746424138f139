//!
//! Convenience re-export of common members.
//!

//
// # Generic core exports
//

pub use crate::engine::Builder;
pub use crate::engine::Engine;
pub use crate::engine::EngineContext;
pub use crate::engine::EngineError;
pub use crate::engine::Profiler;
pub use crate::engine::RunLimit;
pub use crate::engine::Simulation;

pub use crate::engine::BracketKind;
pub use crate::engine::Event;
pub use crate::engine::EventRef;
pub use crate::engine::EventSource;
pub use crate::engine::SinkId;
pub use crate::engine::SourceRef;

pub use crate::time::Duration;
pub use crate::time::SimTime;

//
// # Run policies
//

pub use crate::engine::BatchMeans;
pub use crate::engine::IndependentReplications;
pub use crate::engine::RunPolicy;
pub use crate::engine::SingleRun;

pub use crate::engine::ConstantReplicationsDetector;
pub use crate::engine::RelativePrecisionDetector;
pub use crate::engine::ReplicationsDetector;

//
// # Statistics
//

pub use crate::stats::stat_ref;
pub use crate::stats::AnalyzableStatistic;
pub use crate::stats::BatchMeansAnalyzer;
pub use crate::stats::ReplicationAnalyzer;
pub use crate::stats::SampleAnalyzer;
pub use crate::stats::StatRef;
pub use crate::stats::Statistic;
pub use crate::stats::StdDev;

pub use crate::qn::NodeCategory;
