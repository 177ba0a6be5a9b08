//! Change-notification consumption.
//!
//! Row-change events from the store are re-fetch triggers, not payloads of
//! truth: delivery is at-least-once and may be reordered relative to the
//! write's local echo, so the consumer responds to any matching event by
//! re-fetching the dependent view in full.
//!
//! Subscriptions are keyed by filter (one per filter, no duplicates), carry
//! a bounded queue (a full queue drops the event, which is safe because the
//! next event triggers the same full re-fetch), and are torn down exactly
//! once, either explicitly or on drop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{SyncError, SyncResult};

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Table the change happened in.
    pub table: String,
    pub kind: ChangeKind,
    /// ID of the affected row.
    pub row_id: String,
    /// Optional (column, value) the event is scoped to, e.g.
    /// `("recipient_id", <profile id>)`.
    pub scope: Option<(String, String)>,
}

/// What a subscription listens for: a table plus an optional column
/// equality predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeFilter {
    pub table: String,
    pub scope: Option<(String, String)>,
}

impl ChangeFilter {
    /// Filter for every change on a table.
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            scope: None,
        }
    }

    /// Filter scoped to a column value.
    #[must_use]
    pub fn scoped(table: &str, column: &str, value: &str) -> Self {
        Self {
            table: table.to_string(),
            scope: Some((column.to_string(), value.to_string())),
        }
    }

    fn matches(&self, event: &ChangeEvent) -> bool {
        if self.table != event.table {
            return false;
        }
        match &self.scope {
            None => true,
            Some(scope) => event.scope.as_ref() == Some(scope),
        }
    }

    fn label(&self) -> String {
        match &self.scope {
            None => self.table.clone(),
            Some((column, value)) => format!("{}[{}={}]", self.table, column, value),
        }
    }
}

type Registry = Arc<Mutex<HashMap<ChangeFilter, mpsc::Sender<ChangeEvent>>>>;

/// Fan-out of change events to filter-keyed subscribers.
#[derive(Clone)]
pub struct ChangeFeed {
    subscribers: Registry,
    capacity: usize,
}

impl ChangeFeed {
    /// Create a feed whose subscriptions buffer up to `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to events matching a filter.
    ///
    /// At most one live subscription per filter; a second subscribe for the
    /// same filter fails until the first is dropped or unsubscribed.
    pub fn subscribe(&self, filter: ChangeFilter) -> SyncResult<Subscription> {
        let mut subscribers = lock(&self.subscribers);

        // A closed sender means the previous subscription is gone but was
        // not yet pruned by a publish; treat the slot as free.
        if let Some(existing) = subscribers.get(&filter)
            && !existing.is_closed()
        {
            return Err(SyncError::DuplicateSubscription(filter.label()));
        }

        let (tx, rx) = mpsc::channel(self.capacity);
        subscribers.insert(filter.clone(), tx);

        Ok(Subscription {
            filter: Some(filter),
            rx,
            registry: Arc::clone(&self.subscribers),
        })
    }

    /// Publish an event to every matching subscriber. Returns how many
    /// subscribers received it.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        let mut subscribers = lock(&self.subscribers);
        let mut delivered = 0;

        subscribers.retain(|filter, tx| {
            if tx.is_closed() {
                return false;
            }
            if filter.matches(event) {
                match tx.try_send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        // Safe to drop: the queued events already trigger
                        // the same full re-fetch.
                        tracing::warn!(filter = %filter.label(), "Change queue full, dropping event");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => return false,
                }
            }
            true
        });

        delivered
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers)
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    /// Tear down every subscription. Queued events remain readable; each
    /// subscriber's `recv` returns `None` once its queue drains.
    pub fn shutdown(&self) {
        lock(&self.subscribers).clear();
    }
}

/// A live subscription held by a consuming view.
///
/// Tear-down happens exactly once: through [`Subscription::unsubscribe`] or
/// implicitly on drop, whichever comes first.
pub struct Subscription {
    filter: Option<ChangeFilter>,
    rx: mpsc::Receiver<ChangeEvent>,
    registry: Registry,
}

impl Subscription {
    /// Receive the next matching event. Returns `None` once unsubscribed
    /// and the queue is drained.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Receive without waiting, for coalescing bursts.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.rx.try_recv().ok()
    }

    /// Tear the subscription down.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(filter) = self.filter.take() {
            lock(&self.registry).remove(&filter);
            self.rx.close();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

/// Monotonic generation counter shared between a consuming view and its
/// re-fetch driver.
///
/// The view bumps the generation when it unmounts or its query key changes;
/// a re-fetch result is only applied when the generation at completion
/// still equals the generation at issue, so a stale response can never
/// overwrite newer state.
#[derive(Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    /// Create a new generation counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Invalidate all in-flight fetches.
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fetch-and-apply pair driven by change events.
#[async_trait]
pub trait Refetcher: Send + Sync {
    /// The fetched view data.
    type Output: Send;

    /// Fetch the dependent view in full. Must be idempotent.
    async fn fetch(&self) -> SyncResult<Self::Output>;

    /// Apply a fetched view.
    fn apply(&self, output: Self::Output);
}

/// Single-consumer loop turning change events into idempotent re-fetches.
pub struct RefetchDriver<R: Refetcher> {
    refetcher: R,
    generation: Generation,
    retry: crate::retry::RetryPolicy,
}

impl<R: Refetcher> RefetchDriver<R> {
    /// Create a driver bound to a generation counter.
    pub fn new(refetcher: R, generation: Generation) -> Self {
        Self {
            refetcher,
            generation,
            retry: crate::retry::RetryPolicy::default(),
        }
    }

    /// Override the read-retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: crate::retry::RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Consume the subscription until it closes.
    ///
    /// Bursts of events are coalesced into one re-fetch. A result that
    /// finishes under a bumped generation is discarded, not applied.
    pub async fn run(&self, mut subscription: Subscription) {
        while let Some(event) = subscription.recv().await {
            // Coalesce whatever queued up behind the first event.
            let mut coalesced = 1_u32;
            while subscription.try_recv().is_some() {
                coalesced += 1;
            }
            tracing::debug!(table = %event.table, coalesced, "Change events trigger re-fetch");

            self.refetch_once().await;
        }
    }

    /// One generation-checked fetch/apply round.
    ///
    /// The fetch is an idempotent read, so it retries under the driver's
    /// policy; the apply is skipped when the generation moved on.
    pub async fn refetch_once(&self) {
        let issued_at = self.generation.current();

        match crate::retry::retry_read(&self.retry, || self.refetcher.fetch()).await {
            Ok(output) => {
                if self.generation.current() == issued_at {
                    self.refetcher.apply(output);
                } else {
                    tracing::debug!("Discarding stale re-fetch result");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Re-fetch failed");
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn insert_event(table: &str, row_id: &str) -> ChangeEvent {
        ChangeEvent {
            table: table.to_string(),
            kind: ChangeKind::Insert,
            row_id: row_id.to_string(),
            scope: None,
        }
    }

    fn scoped_event(table: &str, row_id: &str, column: &str, value: &str) -> ChangeEvent {
        ChangeEvent {
            scope: Some((column.to_string(), value.to_string())),
            ..insert_event(table, row_id)
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_matching_subscriber() {
        let feed = ChangeFeed::new(8);
        let mut sub = feed.subscribe(ChangeFilter::table("post")).must_sub();

        let delivered = feed.publish(&insert_event("post", "post1"));
        assert_eq!(delivered, 1);

        let event = sub.recv().await.unwrap();
        assert_eq!(event.row_id, "post1");
    }

    #[tokio::test]
    async fn test_scoped_filter_excludes_other_rows() {
        let feed = ChangeFeed::new(8);
        let mut sub = feed
            .subscribe(ChangeFilter::scoped("notification", "recipient_id", "p1"))
            .must_sub();

        feed.publish(&scoped_event("notification", "n1", "recipient_id", "p2"));
        feed.publish(&scoped_event("notification", "n2", "recipient_id", "p1"));

        let event = sub.recv().await.unwrap();
        assert_eq!(event.row_id, "n2");
    }

    #[tokio::test]
    async fn test_duplicate_subscription_rejected() {
        let feed = ChangeFeed::new(8);
        let _sub = feed.subscribe(ChangeFilter::table("post")).must_sub();

        let second = feed.subscribe(ChangeFilter::table("post"));
        assert!(matches!(second, Err(SyncError::DuplicateSubscription(_))));
    }

    #[tokio::test]
    async fn test_unsubscribe_frees_the_filter() {
        let feed = ChangeFeed::new(8);
        let sub = feed.subscribe(ChangeFilter::table("post")).must_sub();
        sub.unsubscribe();

        assert_eq!(feed.subscriber_count(), 0);
        // The slot is reusable.
        let again = feed.subscribe(ChangeFilter::table("post"));
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let feed = ChangeFeed::new(8);
        {
            let _sub = feed.subscribe(ChangeFilter::table("post")).must_sub();
        }
        assert!(feed.subscribe(ChangeFilter::table("post")).is_ok());
    }

    #[tokio::test]
    async fn test_full_queue_drops_events() {
        let feed = ChangeFeed::new(1);
        let mut sub = feed.subscribe(ChangeFilter::table("post")).must_sub();

        feed.publish(&insert_event("post", "a"));
        feed.publish(&insert_event("post", "b")); // dropped, queue full

        assert_eq!(sub.recv().await.unwrap().row_id, "a");
        assert!(sub.try_recv().is_none());
    }

    struct CountingRefetcher {
        fetches: AtomicUsize,
        applies: AtomicUsize,
        gate: Notify,
        block: bool,
    }

    #[async_trait]
    impl Refetcher for Arc<CountingRefetcher> {
        type Output = ();

        async fn fetch(&self) -> SyncResult<()> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.block {
                self.gate.notified().await;
            }
            Ok(())
        }

        fn apply(&self, (): ()) {
            self.applies.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting(block: bool) -> Arc<CountingRefetcher> {
        Arc::new(CountingRefetcher {
            fetches: AtomicUsize::new(0),
            applies: AtomicUsize::new(0),
            gate: Notify::new(),
            block,
        })
    }

    #[tokio::test]
    async fn test_refetch_applies_fresh_result() {
        let refetcher = counting(false);
        let generation = Generation::new();
        let driver = RefetchDriver::new(Arc::clone(&refetcher), generation);

        driver.refetch_once().await;

        assert_eq!(refetcher.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(refetcher.applies.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refetch_discards_stale_result() {
        let refetcher = counting(true);
        let generation = Generation::new();
        let driver = Arc::new(RefetchDriver::new(
            Arc::clone(&refetcher),
            generation.clone(),
        ));

        let task = tokio::spawn({
            let driver = Arc::clone(&driver);
            async move { driver.refetch_once().await }
        });

        // Wait for the fetch to start, then invalidate (view unmounted).
        while refetcher.fetches.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        generation.bump();
        refetcher.gate.notify_waiters();
        task.await.unwrap();

        assert_eq!(refetcher.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(refetcher.applies.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_driver_coalesces_bursts() {
        let refetcher = counting(false);
        let generation = Generation::new();
        let driver = RefetchDriver::new(Arc::clone(&refetcher), generation);

        let feed = ChangeFeed::new(16);
        let sub = feed.subscribe(ChangeFilter::table("post")).must_sub();

        for i in 0..5 {
            feed.publish(&insert_event("post", &format!("post{i}")));
        }
        feed.shutdown();

        // The publisher side is gone; run drains the queued burst and exits.
        driver.run(sub).await;

        // All five queued events coalesce into a single re-fetch round.
        assert_eq!(refetcher.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(refetcher.applies.load(Ordering::SeqCst), 1);
    }

    trait MustSub<T> {
        fn must_sub(self) -> T;
    }

    impl<T> MustSub<T> for SyncResult<T> {
        fn must_sub(self) -> T {
            match self {
                Ok(value) => value,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
    }
}
