//! Single-flight gate for refresh requests.
//!
//! Concurrent requests presenting the same refresh token execute the
//! rotation once and all receive the same outcome. Distinct tokens never
//! block one another.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

pub struct RefreshGate<T: Clone> {
    inflight: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T: Clone> Default for RefreshGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> RefreshGate<T> {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `op` for `key`, collapsing concurrent callers onto one execution.
    ///
    /// The first caller for a key runs `op`; everyone who arrives while it is
    /// in flight awaits the same cell and clones its value. Once resolved the
    /// key is retired, so a later call with the same key runs `op` again
    /// (single-use rejection is the token registry's job, not this one's).
    /// A flight abandoned by cancellation retires its key when the last
    /// waiter drops out, so the map never accumulates dead entries.
    pub async fn run<F, Fut>(&self, key: &str, op: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let cell = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let _flight = Flight {
            gate: self,
            key,
            cell: &cell,
        };
        cell.get_or_init(op).await.clone()
    }

    /// Number of keys with a flight in progress.
    pub fn inflight_len(&self) -> usize {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Retires the key when the flight ends, whether it resolved or every
/// waiter was cancelled.
struct Flight<'a, T: Clone> {
    gate: &'a RefreshGate<T>,
    key: &'a str,
    cell: &'a Arc<OnceCell<T>>,
}

impl<T: Clone> Drop for Flight<'_, T> {
    fn drop(&mut self) {
        let mut inflight = self
            .gate
            .inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let Some(current) = inflight.get(self.key) else {
            return;
        };
        // A fresh call may already have re-inserted under the same key.
        if !Arc::ptr_eq(current, self.cell) {
            return;
        }

        // Resolved flights retire immediately; an unresolved one retires
        // only when this was its last waiter (count: the map's clone plus
        // ours). Clones are only taken under the map lock, so the count is
        // stable here.
        if self.cell.initialized() || Arc::strong_count(self.cell) == 2 {
            inflight.remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let gate = Arc::new(RefreshGate::<usize>::new());
        let executions = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let gate = gate.clone();
            let executions = executions.clone();
            handles.push(tokio::spawn(async move {
                gate.run("token-a", || async {
                    executions.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    42
                })
                .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 42);
        }
        assert_eq!(executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let gate = RefreshGate::<&'static str>::new();
        let a = gate.run("token-a", || async { "a" }).await;
        let b = gate.run("token-b", || async { "b" }).await;
        assert_eq!(a, "a");
        assert_eq!(b, "b");
    }

    #[tokio::test]
    async fn key_is_retired_after_resolution() {
        let gate = RefreshGate::<usize>::new();
        let executions = AtomicUsize::new(0);

        for _ in 0..2 {
            gate.run("token-a", || async {
                executions.fetch_add(1, Ordering::SeqCst);
                7
            })
            .await;
        }

        // Sequential calls each execute: the gate collapses concurrency only.
        assert_eq!(executions.load(Ordering::SeqCst), 2);
        assert_eq!(gate.inflight_len(), 0);
    }

    #[tokio::test]
    async fn cancelled_flight_is_reclaimed() {
        let gate = Arc::new(RefreshGate::<usize>::new());

        let handle = tokio::spawn({
            let gate = gate.clone();
            async move {
                gate.run("token-a", || async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    1
                })
                .await
            }
        });

        // Let the flight start, then cancel its only waiter.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(gate.inflight_len(), 1);
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        assert_eq!(gate.inflight_len(), 0);

        // The key is free again: a later call executes fresh.
        let value = gate.run("token-a", || async { 2 }).await;
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn cancelling_one_waiter_keeps_the_flight_alive() {
        let gate = Arc::new(RefreshGate::<usize>::new());
        let executions = Arc::new(AtomicUsize::new(0));

        let spawn_waiter = |gate: Arc<RefreshGate<usize>>, executions: Arc<AtomicUsize>| {
            tokio::spawn(async move {
                gate.run("token-a", move || async move {
                    executions.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    9
                })
                .await
            })
        };

        let first = spawn_waiter(gate.clone(), executions.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = spawn_waiter(gate.clone(), executions.clone());
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Cancelling a waiter that is not driving the rotation must not
        // tear down the shared flight.
        second.abort();
        let _ = second.await;
        assert_eq!(gate.inflight_len(), 1);

        assert_eq!(first.await.unwrap(), 9);
        assert_eq!(executions.load(Ordering::SeqCst), 1);
        assert_eq!(gate.inflight_len(), 0);
    }
}
