//! Client-side state synchronization for athlo.
//!
//! The patterns a client of the athlo API needs to stay consistent with the
//! authoritative store without blocking on it:
//!
//! - **Optimistic toggles** ([`OptimisticToggle`]): apply a like/follow flip
//!   locally before the server confirms, roll it back if the mutation
//!   fails, and never let two toggles for the same target interleave.
//! - **Change-notification consumption** ([`ChangeFeed`],
//!   [`RefetchDriver`]): subscribe to row-change events, coalesce them into
//!   idempotent full re-fetches, and discard results that arrive after the
//!   consuming view moved on.
//! - **Read retries** ([`RetryPolicy`]): bounded backoff for idempotent
//!   reads only; writes are never auto-retried.
//!
//! The crate has no database or HTTP dependency; the durable side of a
//! toggle is supplied through the [`ToggleStore`] trait.

pub mod consumer;
pub mod error;
pub mod optimistic;
pub mod retry;

pub use consumer::{
    ChangeEvent, ChangeFeed, ChangeFilter, ChangeKind, Generation, RefetchDriver, Refetcher,
    Subscription,
};
pub use error::{SyncError, SyncResult};
pub use optimistic::{EngagementView, OptimisticToggle, ToggleOutcome, ToggleState, ToggleStore};
pub use retry::{RetryPolicy, retry_read};
