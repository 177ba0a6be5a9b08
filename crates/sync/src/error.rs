//! Error types for the sync crate.

use thiserror::Error;

/// Sync result type.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the state-synchronization layer.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A toggle for this (actor, target) pair is already in flight. The
    /// request was rejected without touching any state.
    #[error("Toggle already in flight for this target")]
    TogglePending,

    /// A subscription with an identical filter already exists.
    #[error("Duplicate subscription for filter {0}")]
    DuplicateSubscription(String),

    /// The durable store rejected or failed a mutation.
    #[error("Store error: {0}")]
    Store(String),

    /// An idempotent read kept failing after bounded retries.
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// The final error message.
        last_error: String,
    },
}
