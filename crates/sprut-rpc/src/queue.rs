//! Pending-request table with per-request timeouts.
//!
//! Every in-flight request registers its correlation id here together with a
//! oneshot sender. Exactly one terminal outcome reaches that sender: the real
//! response, a synthetic [`Error::RequestTimeout`], or nothing at all when the
//! entry is dropped during shutdown. The single `HashMap::remove` ownership
//! transfer is what enforces the exactly-once property.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::Response;

/// Completion side of one pending request.
pub type Waiter = oneshot::Sender<Result<Response>>;

struct Pending {
    waiter: Waiter,
    timer: JoinHandle<()>,
}

/// Correlation-id → waiting caller map.
#[derive(Clone, Default)]
pub struct ResponseQueue {
    pending: Arc<Mutex<HashMap<u64, Pending>>>,
}

impl ResponseQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id` and start its timeout timer.
    ///
    /// An existing entry for the same id is replaced and its timer canceled.
    /// Ids are monotonic for the client's lifetime, so replacement only
    /// happens on misuse; the displaced waiter observes a closed channel.
    pub fn add(&self, id: u64, waiter: Waiter, timeout: Duration) {
        let mut pending = self.lock();
        if let Some(previous) = pending.remove(&id) {
            previous.timer.abort();
        }

        let map = Arc::clone(&self.pending);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let entry = map
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            if let Some(entry) = entry {
                debug!(id, ?timeout, "request timed out");
                let _ = entry.waiter.send(Err(Error::RequestTimeout { id, timeout }));
            }
        });

        let _ = pending.insert(id, Pending { waiter, timer });
    }

    /// Deliver the real response for `id`, canceling its timer.
    ///
    /// Returns false when no entry is waiting (late response after a timeout,
    /// or an id this client never issued).
    pub fn resolve(&self, id: u64, response: Response) -> bool {
        let Some(entry) = self.lock().remove(&id) else {
            debug!(id, "response for unknown or already-settled request");
            return false;
        };
        entry.timer.abort();
        let _ = entry.waiter.send(Ok(response));
        true
    }

    /// Drop the entry for `id` without delivering anything. No-op for
    /// unknown ids.
    pub fn remove(&self, id: u64) {
        if let Some(entry) = self.lock().remove(&id) {
            entry.timer.abort();
        }
    }

    /// Drop all entries and cancel all timers. Used on client shutdown so no
    /// timer fires after teardown.
    pub fn clear(&self) {
        let mut pending = self.lock();
        for (_, entry) in pending.drain() {
            entry.timer.abort();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_delivers_synthetic_error_once() {
        let queue = ResponseQueue::new();
        let (tx, rx) = oneshot::channel();
        queue.add(7, tx, Duration::from_millis(100));

        let outcome = rx.await.expect("waiter must receive an outcome");
        match outcome {
            Err(Error::RequestTimeout { id, timeout }) => {
                assert_eq!(id, 7);
                assert_eq!(timeout, Duration::from_millis(100));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_delivers_response_and_cancels_timer() {
        let queue = ResponseQueue::new();
        let (tx, rx) = oneshot::channel();
        queue.add(1, tx, Duration::from_millis(100));

        assert!(queue.resolve(1, Response::success(1, json!({"ok": true}))));
        let response = rx.await.unwrap().unwrap();
        assert_eq!(response.id, 1);

        // Run well past the timeout; the aborted timer must not fire again.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_unknown_id_is_noop() {
        let queue = ResponseQueue::new();
        assert!(!queue.resolve(99, Response::success(99, json!(null))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_timeout_is_dropped() {
        let queue = ResponseQueue::new();
        let (tx, rx) = oneshot::channel();
        queue.add(2, tx, Duration::from_millis(50));

        assert!(matches!(
            rx.await.unwrap(),
            Err(Error::RequestTimeout { id: 2, .. })
        ));
        // The matching response arrives too late and settles nothing.
        assert!(!queue.resolve(2, Response::success(2, json!(null))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_add_replaces_entry() {
        let queue = ResponseQueue::new();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        queue.add(5, tx1, Duration::from_secs(10));
        queue.add(5, tx2, Duration::from_secs(10));
        assert_eq!(queue.len(), 1);

        // Displaced waiter observes a closed channel, never two outcomes.
        assert!(rx1.await.is_err());

        assert!(queue.resolve(5, Response::success(5, json!(null))));
        assert!(rx2.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_drops_entry_silently() {
        let queue = ResponseQueue::new();
        let (tx, rx) = oneshot::channel();
        queue.add(3, tx, Duration::from_millis(100));
        queue.remove(3);
        queue.remove(42); // unknown id: no-op

        assert!(rx.await.is_err());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_everything() {
        let queue = ResponseQueue::new();
        let mut receivers = Vec::new();
        for id in 1..=4 {
            let (tx, rx) = oneshot::channel();
            queue.add(id, tx, Duration::from_millis(100));
            receivers.push(rx);
        }
        queue.clear();
        assert!(queue.is_empty());

        for rx in receivers {
            assert!(rx.await.is_err());
        }
    }
}
