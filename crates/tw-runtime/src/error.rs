//! Error types for the runtime.

use thiserror::Error;
use tw_core::{EventId, StateError};

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that abort an `invoke`, `revert`, or instance construction.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// `then` was asked to continue after a queue that already holds delayed events.
    #[error("illegal queue composition: delayed events must end a chain")]
    IllegalQueueComposition,

    /// The revert target is not in the archived history.
    #[error("invalid revert target: {0}")]
    InvalidRevertTarget(EventId),

    /// A configuration value has the wrong type.
    #[error("option '{name}' must be {expected}")]
    InvalidOptionType {
        /// The offending option.
        name: String,
        /// Description of the accepted type.
        expected: &'static str,
    },

    /// A configuration key is not recognised.
    #[error("unknown option: {0}")]
    InvalidOptionName(String),

    /// A uniform choice was requested from an empty sequence or charset.
    #[error("cannot choose from an empty sequence")]
    EmptyChoice,

    /// An integer draw was requested with `min > max`.
    #[error("invalid range: {min}..={max}")]
    InvalidRange {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
    },

    /// A single `invoke` executed more records than the configured limit.
    #[error("event chain exceeded {0} steps")]
    StepLimitExceeded(usize),

    /// An event function gave up.
    #[error("event aborted: {0}")]
    Aborted(String),

    /// Agent state error.
    #[error(transparent)]
    State(#[from] StateError),

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}
