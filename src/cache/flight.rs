//! Per-key single-flight registry.
//!
//! Concurrent loads for the same key share one in-flight slot: the first caller runs
//! the load, later callers await its outcome. Slots are keyed by cache key, so loads
//! of unrelated keys never wait on each other. A slot is removed from the registry as
//! soon as its load completes, or when every caller waiting on it has been dropped.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

type Slot<T, E> = OnceCell<Result<T, Arc<E>>>;

#[derive(Default)]
pub(crate) struct FlightRegistry {
    flights: DashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl FlightRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `load` for `key` unless a load for `key` is already in flight, in which
    /// case wait for that one and return a clone of its result.
    ///
    /// If the leading caller is dropped mid-load, one of the waiters runs its own
    /// `load` in its place.
    pub(crate) async fn run<T, E, F, Fut>(&self, key: &str, load: F) -> Result<T, Arc<E>>
    where
        T: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        // The shard guard must be released before awaiting.
        let erased: Arc<dyn Any + Send + Sync> = {
            let entry = self.flights.entry(key.to_string()).or_insert_with(|| {
                Arc::new(Slot::<T, E>::new()) as Arc<dyn Any + Send + Sync>
            });
            Arc::clone(entry.value())
        };
        let registration = Registration {
            flights: &self.flights,
            key,
            erased,
        };

        let slot = match Arc::clone(&registration.erased).downcast::<Slot<T, E>>() {
            Ok(slot) => slot,
            Err(_) => {
                tracing::warn!(key = %key, "Key reused with a different value type, loading without coalescing");
                return load().await.map_err(Arc::new);
            }
        };

        let result = slot
            .get_or_init(|| async { load().await.map_err(Arc::new) })
            .await
            .clone();

        self.flights
            .remove_if(key, |_, current| Arc::ptr_eq(current, &registration.erased));

        result
    }

    /// Number of keys with a load currently registered.
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.flights.len()
    }
}

/// A caller's hold on a registered slot.
///
/// Dropping the last hold on a slot that never completed (its callers were all
/// cancelled) removes it from the registry.
struct Registration<'a> {
    flights: &'a DashMap<String, Arc<dyn Any + Send + Sync>>,
    key: &'a str,
    erased: Arc<dyn Any + Send + Sync>,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        // The registry's handle plus this one.
        self.flights.remove_if(self.key, |_, current| {
            Arc::ptr_eq(current, &self.erased) && Arc::strong_count(current) <= 2
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_runs_share_one_load() {
        let registry = Arc::new(FlightRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                registry
                    .run::<u32, String, _, _>("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_error_is_shared_with_waiters() {
        let registry = Arc::new(FlightRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                registry
                    .run::<u32, String, _, _>("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Err("backend unavailable".to_string())
                    })
                    .await
            }));
        }

        let mut errors = Vec::new();
        for handle in handles {
            errors.push(handle.await.unwrap().unwrap_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(errors.iter().all(|e| Arc::ptr_eq(e, &errors[0])));
        assert_eq!(errors[0].as_str(), "backend unavailable");
    }

    #[tokio::test]
    async fn test_distinct_keys_load_independently() {
        let registry = Arc::new(FlightRegistry::new());

        // "slow" holds its slot while "fast" completes; the two must not serialize.
        let slow = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .run::<u32, String, _, _>("slow", || async {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        Ok(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = std::time::Instant::now();
        let fast = registry
            .run::<u32, String, _, _>("fast", || async { Ok(2) })
            .await;
        assert_eq!(fast.unwrap(), 2);
        assert!(started.elapsed() < Duration::from_millis(200));

        assert_eq!(slow.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_lone_load_leaves_no_slot() {
        let registry = FlightRegistry::new();

        let cancelled = tokio::time::timeout(
            Duration::from_millis(20),
            registry.run::<u32, String, _, _>("k", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            }),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(registry.in_flight(), 0);

        let next = registry
            .run::<u32, String, _, _>("k", || async { Ok(2) })
            .await;
        assert_eq!(next.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_leader_keeps_slot_for_waiters() {
        let registry = Arc::new(FlightRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = {
            let registry = Arc::clone(&registry);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                registry
                    .run::<u32, String, _, _>("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Ok(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let waiter = {
            let registry = Arc::clone(&registry);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                registry
                    .run::<u32, String, _, _>("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(2)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        leader.abort();
        assert!(leader.await.is_err());
        assert_eq!(registry.in_flight(), 1);

        assert_eq!(waiter.await.unwrap().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_completed_flight_starts_new_episode() {
        let registry = FlightRegistry::new();

        let first = registry
            .run::<u32, String, _, _>("k", || async { Err("boom".to_string()) })
            .await;
        assert!(first.is_err());

        let second = registry
            .run::<u32, String, _, _>("k", || async { Ok(7) })
            .await;
        assert_eq!(second.unwrap(), 7);
    }
}
