//! Error types for runtime configuration and state inspection.
//!
//! A failed computation is never one of these: it is data, reported as
//! [`ResultState::Failure`](crate::ResultState::Failure).

use futures::task::SpawnError;

/// Errors raised by the runtime itself.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The builder was finished without an executor.
    #[error("no spawner configured: call `FlowRuntimeBuilder::spawner` before `build`")]
    MissingSpawner,

    /// The executor refused to accept a settlement task.
    #[error("failed to spawn settlement task: {0}")]
    Spawn(#[from] SpawnError),
}

/// A [`ResultState`](crate::ResultState) that has not reached a terminal
/// variant yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Unsettled {
    /// No computation is associated.
    #[error("no computation has been requested")]
    NotAsked,

    /// The computation is still pending.
    #[error("computation is still loading")]
    Loading,
}
