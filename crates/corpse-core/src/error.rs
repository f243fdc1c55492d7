//! Game error types.

use thiserror::Error;

/// Top-level error type shared by the writing and reveal phases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// An index was computed against a tale set that no longer matches the
    /// one held by the session (e.g. the roster changed mid-round).
    #[error("stale reference: {0}")]
    StaleReference(String),

    /// A round, tale, or chapter counter fell outside its collection.
    #[error("{what} index {index} is out of range (len {len})")]
    OutOfRange {
        /// The kind of collection that was indexed.
        what: &'static str,
        /// The offending index.
        index: usize,
        /// The collection length.
        len: usize,
    },

    /// A trigger tried to close a phase step that was already closed.
    #[error("duplicate {phase} transition: at step {current}, trigger was for step {requested}")]
    DuplicateTransition {
        /// The phase that rejected the trigger.
        phase: &'static str,
        /// The step the controller is currently on.
        current: usize,
        /// The step the trigger referred to.
        requested: usize,
    },

    /// An operation was not permitted in the current state.
    #[error("validation error: {0}")]
    Validation(String),

    /// The consensus channel failed or was closed.
    #[error("channel error: {0}")]
    Channel(String),
}
