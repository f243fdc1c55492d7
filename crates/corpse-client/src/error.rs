//! Corpse client — startup and session error types.

use corpse_core::error::GameError;
use thiserror::Error;

/// Errors surfaced by the client binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is missing a valid value.
    #[error("configuration error: {0}")]
    Config(String),

    /// A game phase failed.
    #[error("game error: {0}")]
    Game(#[from] GameError),

    /// A session task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}
