use thiserror::Error;

/// An error raised by an engine operation.
///
/// Only hard failures surface as errors. Recoverable conditions (scheduling
/// from a disabled source, retiming into the past, rescheduling to an
/// unchanged fire time) are logged as warnings and handled permissively.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An argument did not refer to a valid engine object, e.g. a statistic
    /// handle that was never registered.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation that contradicts the state of the clock, e.g. stopping
    /// the simulation at an already elapsed time.
    #[error("logic error: {0}")]
    LogicError(String),

    /// An operation the engine (or the active run policy) does not support.
    /// Engines are not cloneable; a run policy without an output analysis
    /// method reports its statistic factory through this variant.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
