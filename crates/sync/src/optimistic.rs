//! Optimistic toggle engine.
//!
//! A toggle (like/unlike, follow/unfollow) goes through an explicit
//! two-phase lifecycle from the client's point of view:
//!
//! 1. The local view flips synchronously (tentative) so the UI can render
//!    it at once.
//! 2. The durable mutation runs; on success the tentative view is replaced
//!    by the server's authoritative answer, on failure the prior view is
//!    restored and the error surfaced.
//!
//! At most one toggle per (actor, target) pair may be in flight; a second
//! request while one is pending is rejected without touching any state.
//! Counts adjusted locally are estimates and are always overwritten by the
//! next authoritative value.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::{SyncError, SyncResult};

/// The rendered engagement state of one toggle target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementView {
    /// Whether the actor's toggle is on (liked / following).
    pub active: bool,
    /// The associated counter (likes count / followers count).
    pub count: i64,
}

impl EngagementView {
    /// The locally estimated view after flipping the toggle.
    #[must_use]
    pub const fn flipped(self) -> Self {
        let count = if self.active {
            self.count - 1
        } else {
            self.count + 1
        };
        Self {
            active: !self.active,
            count: if count < 0 { 0 } else { count },
        }
    }
}

/// Per-target slot state: the explicit tagged representation of
/// tentative-versus-settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    /// The last authoritative (or seeded) view.
    Settled(EngagementView),
    /// A flip has been applied locally and its mutation is in flight.
    Tentative {
        /// What the UI currently shows.
        shown: EngagementView,
        /// What to restore on failure.
        prior: EngagementView,
    },
}

impl ToggleState {
    /// The view a consumer should render right now.
    #[must_use]
    pub const fn view(&self) -> EngagementView {
        match self {
            Self::Settled(view) | Self::Tentative { shown: view, .. } => *view,
        }
    }
}

/// How a completed toggle settled.
#[derive(Debug)]
pub enum ToggleOutcome {
    /// The store confirmed the mutation; the authoritative view is now
    /// displayed.
    Confirmed(EngagementView),
    /// The mutation failed; the pre-toggle view was restored.
    RolledBack {
        /// The restored view.
        restored: EngagementView,
        /// Why the mutation failed.
        error: SyncError,
    },
}

/// The durable side of a toggle.
///
/// `apply` must be idempotent per (actor, target, desired state): the
/// server treats a duplicate like/follow as a no-op, so an ambiguous retry
/// cannot double-count.
#[async_trait]
pub trait ToggleStore: Send + Sync {
    /// Persist the desired toggle state and return the authoritative view.
    async fn apply(
        &self,
        actor: &str,
        target: &str,
        desired_active: bool,
    ) -> SyncResult<EngagementView>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ToggleKey {
    actor: String,
    target: String,
}

/// Optimistic toggle engine over a [`ToggleStore`].
pub struct OptimisticToggle<S: ToggleStore> {
    store: S,
    slots: Mutex<HashMap<ToggleKey, ToggleState>>,
}

impl<S: ToggleStore> OptimisticToggle<S> {
    /// Create a new engine.
    pub fn new(store: S) -> Self {
        Self {
            store,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Current state for a pair, if any is tracked.
    pub fn state(&self, actor: &str, target: &str) -> Option<ToggleState> {
        self.lock_slots().get(&key(actor, target)).copied()
    }

    /// Current displayable view for a pair, if any is tracked.
    pub fn view(&self, actor: &str, target: &str) -> Option<EngagementView> {
        self.state(actor, target).map(|s| s.view())
    }

    /// Overwrite a pair's view with a server-fetched value.
    ///
    /// A locally estimated count is never authoritative; every fresh read
    /// of the target lands here. While a toggle is in flight the overwrite
    /// is skipped: the in-flight settle will bring its own authoritative
    /// view, and clobbering the tentative state would lose the rollback
    /// anchor.
    pub fn apply_authoritative(&self, actor: &str, target: &str, view: EngagementView) {
        let mut slots = self.lock_slots();
        match slots.get(&key(actor, target)) {
            Some(ToggleState::Tentative { .. }) => {
                tracing::debug!(actor, target, "Skipping overwrite while toggle in flight");
            }
            _ => {
                slots.insert(key(actor, target), ToggleState::Settled(view));
            }
        }
    }

    /// Toggle a target.
    ///
    /// The flip is applied synchronously (before the first await point), so
    /// the tentative view is observable through [`Self::view`] while the
    /// durable mutation runs. `known` seeds the pair when the engine has
    /// not tracked it yet (the caller's current rendering).
    ///
    /// Returns [`SyncError::TogglePending`] without side effects when a
    /// toggle for the pair is already in flight.
    pub async fn toggle(
        &self,
        actor: &str,
        target: &str,
        known: EngagementView,
    ) -> SyncResult<ToggleOutcome> {
        let shown = {
            let mut slots = self.lock_slots();
            let slot = slots.entry(key(actor, target)).or_insert(ToggleState::Settled(known));

            let prior = match *slot {
                ToggleState::Tentative { .. } => return Err(SyncError::TogglePending),
                ToggleState::Settled(view) => view,
            };

            let shown = prior.flipped();
            *slot = ToggleState::Tentative { shown, prior };
            shown
        };

        match self.store.apply(actor, target, shown.active).await {
            Ok(authoritative) => {
                self.settle(actor, target, authoritative);
                Ok(ToggleOutcome::Confirmed(authoritative))
            }
            Err(error) => {
                let restored = self.rollback(actor, target);
                Ok(ToggleOutcome::RolledBack { restored, error })
            }
        }
    }

    fn settle(&self, actor: &str, target: &str, view: EngagementView) {
        self.lock_slots()
            .insert(key(actor, target), ToggleState::Settled(view));
    }

    fn rollback(&self, actor: &str, target: &str) -> EngagementView {
        let mut slots = self.lock_slots();
        let slot_key = key(actor, target);
        let restored = match slots.get(&slot_key) {
            Some(ToggleState::Tentative { prior, .. }) => *prior,
            Some(ToggleState::Settled(view)) => *view,
            None => EngagementView {
                active: false,
                count: 0,
            },
        };
        slots.insert(slot_key, ToggleState::Settled(restored));
        restored
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<ToggleKey, ToggleState>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn key(actor: &str, target: &str) -> ToggleKey {
    ToggleKey {
        actor: actor.to_string(),
        target: target.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    /// Store that confirms with a fixed count.
    struct OkStore {
        count: i64,
    }

    #[async_trait]
    impl ToggleStore for OkStore {
        async fn apply(
            &self,
            _actor: &str,
            _target: &str,
            desired_active: bool,
        ) -> SyncResult<EngagementView> {
            Ok(EngagementView {
                active: desired_active,
                count: self.count,
            })
        }
    }

    /// Store that always fails.
    struct FailStore;

    #[async_trait]
    impl ToggleStore for FailStore {
        async fn apply(
            &self,
            _actor: &str,
            _target: &str,
            _desired_active: bool,
        ) -> SyncResult<EngagementView> {
            Err(SyncError::Store("permission denied".to_string()))
        }
    }

    /// Store that blocks until released, counting entries.
    struct BlockingStore {
        entered: AtomicU32,
        release: Notify,
    }

    #[async_trait]
    impl ToggleStore for BlockingStore {
        async fn apply(
            &self,
            _actor: &str,
            _target: &str,
            desired_active: bool,
        ) -> SyncResult<EngagementView> {
            self.entered.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            Ok(EngagementView {
                active: desired_active,
                count: 1,
            })
        }
    }

    const START: EngagementView = EngagementView {
        active: false,
        count: 3,
    };

    #[test]
    fn test_flipped_adjusts_count_both_ways() {
        let on = START.flipped();
        assert!(on.active);
        assert_eq!(on.count, 4);

        let off = on.flipped();
        assert!(!off.active);
        assert_eq!(off.count, 3);
    }

    #[test]
    fn test_flipped_clamps_at_zero() {
        let view = EngagementView {
            active: true,
            count: 0,
        };
        assert_eq!(view.flipped().count, 0);
    }

    #[tokio::test]
    async fn test_confirmed_toggle_takes_authoritative_view() {
        let engine = OptimisticToggle::new(OkStore { count: 10 });

        let outcome = engine.toggle("p1", "post1", START).await.unwrap();

        match outcome {
            ToggleOutcome::Confirmed(view) => {
                assert!(view.active);
                // Server count wins over the local estimate of 4.
                assert_eq!(view.count, 10);
            }
            ToggleOutcome::RolledBack { .. } => panic!("Expected confirmation"),
        }
        assert_eq!(
            engine.view("p1", "post1").unwrap(),
            EngagementView {
                active: true,
                count: 10
            }
        );
    }

    #[tokio::test]
    async fn test_failed_toggle_rolls_back() {
        let engine = OptimisticToggle::new(FailStore);

        let outcome = engine.toggle("p1", "post1", START).await.unwrap();

        match outcome {
            ToggleOutcome::RolledBack { restored, error } => {
                assert_eq!(restored, START);
                assert!(matches!(error, SyncError::Store(_)));
            }
            ToggleOutcome::Confirmed(_) => panic!("Expected rollback"),
        }
        // The engine shows the pre-toggle view again.
        assert_eq!(engine.view("p1", "post1").unwrap(), START);
    }

    #[tokio::test]
    async fn test_second_toggle_while_pending_is_rejected() {
        let store = Arc::new(BlockingStore {
            entered: AtomicU32::new(0),
            release: Notify::new(),
        });

        struct SharedStore(Arc<BlockingStore>);

        #[async_trait]
        impl ToggleStore for SharedStore {
            async fn apply(
                &self,
                actor: &str,
                target: &str,
                desired_active: bool,
            ) -> SyncResult<EngagementView> {
                self.0.apply(actor, target, desired_active).await
            }
        }

        let engine = Arc::new(OptimisticToggle::new(SharedStore(Arc::clone(&store))));

        let first = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move { engine.toggle("p1", "post1", START).await }
        });

        // Wait for the first toggle to reach the store.
        while store.entered.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        // The tentative flip is already visible.
        assert!(matches!(
            engine.state("p1", "post1"),
            Some(ToggleState::Tentative { .. })
        ));

        // A second toggle for the same pair is rejected outright.
        let second = engine.toggle("p1", "post1", START).await;
        assert!(matches!(second, Err(SyncError::TogglePending)));

        // Release the in-flight toggle and let it settle.
        store.release.notify_waiters();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, ToggleOutcome::Confirmed(_)));
        assert_eq!(store.entered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_cycle_restores_count() {
        // Toggle on then off against a store that echoes the desired state
        // with the matching count.
        struct EchoStore;

        #[async_trait]
        impl ToggleStore for EchoStore {
            async fn apply(
                &self,
                _actor: &str,
                _target: &str,
                desired_active: bool,
            ) -> SyncResult<EngagementView> {
                Ok(EngagementView {
                    active: desired_active,
                    count: if desired_active { 4 } else { 3 },
                })
            }
        }

        let engine = OptimisticToggle::new(EchoStore);

        engine.toggle("p1", "post1", START).await.unwrap();
        let current = engine.view("p1", "post1").unwrap();
        engine.toggle("p1", "post1", current).await.unwrap();

        assert_eq!(engine.view("p1", "post1").unwrap(), START);
    }

    #[tokio::test]
    async fn test_apply_authoritative_overwrites_settled_view() {
        let engine = OptimisticToggle::new(OkStore { count: 1 });

        engine.apply_authoritative(
            "p1",
            "post1",
            EngagementView {
                active: true,
                count: 42,
            },
        );

        assert_eq!(
            engine.view("p1", "post1").unwrap(),
            EngagementView {
                active: true,
                count: 42
            }
        );
    }
}
