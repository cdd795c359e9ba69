//! Behavioral tests for the tiered cache against an in-memory distributed tier.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::*;

#[derive(Default)]
struct InMemoryTier {
    entries: Mutex<HashMap<String, (Vec<u8>, u64)>>,
    failing: AtomicBool,
    gets: AtomicUsize,
    sets: AtomicUsize,
}

impl InMemoryTier {
    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn ttl_of(&self, key: &str) -> Option<u64> {
        self.entries.lock().unwrap().get(key).map(|(_, ttl)| *ttl)
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl DistributedTier for InMemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .map(|(bytes, _)| bytes.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_seconds: u64) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, ttl_seconds));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        self.check()?;
        let pattern = KeyPattern::new(pattern).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), CacheError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    id: i64,
    name: String,
}

fn record(id: i64) -> Record {
    Record {
        id,
        name: format!("record-{id}"),
    }
}

fn local_tier() -> LocalTier {
    LocalTier::new(&LocalCacheConfig {
        max_capacity: 1000,
        time_to_idle_seconds: 0,
    })
}

fn cache_with(tier: &Arc<InMemoryTier>) -> TieredCache {
    TieredCache::new(
        local_tier(),
        Arc::clone(tier) as Arc<dyn DistributedTier>,
        TtlPair::from_secs(600, 1800),
    )
}

fn setup() -> (TieredCache, Arc<InMemoryTier>) {
    let tier = Arc::new(InMemoryTier::default());
    (cache_with(&tier), tier)
}

#[tokio::test]
async fn test_get_misses_on_empty_cache() {
    let (cache, _) = setup();
    assert_eq!(cache.get::<Record>("stand:id:1").await, None);
}

#[tokio::test]
async fn test_set_then_get_hits_local_tier() {
    let (cache, tier) = setup();
    cache
        .set("stand:id:1", &record(1), TtlPair::from_secs(600, 1800))
        .await;

    assert_eq!(cache.get::<Record>("stand:id:1").await, Some(record(1)));
    assert_eq!(tier.gets.load(Ordering::SeqCst), 0);
    assert_eq!(tier.ttl_of("stand:id:1"), Some(1800));
}

#[tokio::test]
async fn test_distributed_hit_is_promoted() {
    let tier = Arc::new(InMemoryTier::default());

    // Another instance populated the shared tier.
    cache_with(&tier)
        .set("stand:id:2", &record(2), TtlPair::from_secs(600, 1800))
        .await;

    let cache = cache_with(&tier);
    assert_eq!(cache.get::<Record>("stand:id:2").await, Some(record(2)));
    assert_eq!(tier.gets.load(Ordering::SeqCst), 1);

    assert_eq!(cache.get::<Record>("stand:id:2").await, Some(record(2)));
    assert_eq!(tier.gets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_or_load_loads_once_then_serves_cache() {
    let (cache, _) = setup();
    let calls = AtomicUsize::new(0);

    for _ in 0..3 {
        let value = cache
            .get_or_load::<_, String, _, _>("stand:id:3", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(record(3))
            })
            .await
            .unwrap();
        assert_eq!(value, record(3));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_misses_load_once() {
    let (cache, _) = setup();
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..100 {
        let cache = cache.clone();
        let calls = Arc::clone(&calls);
        handles.push(tokio::spawn(async move {
            cache
                .get_or_load::<_, String, _, _>("stand:all", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(vec![record(1), record(2)])
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), vec![record(1), record(2)]);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_loader_error_is_not_cached() {
    let (cache, tier) = setup();

    let result = cache
        .get_or_load::<Record, String, _, _>("stand:id:4", || async {
            Err("database down".to_string())
        })
        .await;
    assert_eq!(result.unwrap_err().as_str(), "database down");
    assert_eq!(cache.get::<Record>("stand:id:4").await, None);
    assert_eq!(tier.sets.load(Ordering::SeqCst), 0);

    let value = cache
        .get_or_load::<_, String, _, _>("stand:id:4", || async { Ok(record(4)) })
        .await
        .unwrap();
    assert_eq!(value, record(4));
}

#[tokio::test]
async fn test_absent_value_is_not_cached() {
    let (cache, tier) = setup();

    cache
        .set::<Option<Record>>("stand:id:5", &None, TtlPair::from_secs(600, 1800))
        .await;
    assert_eq!(tier.sets.load(Ordering::SeqCst), 0);
    assert_eq!(cache.local_entry_count(), 0);

    let calls = AtomicUsize::new(0);
    for _ in 0..2 {
        let value = cache
            .get_or_load::<Option<Record>, String, _, _>("stand:id:5", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(value, None);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_zero_ttl_skips_tier() {
    let (cache, tier) = setup();

    cache
        .set("local-only", &record(6), TtlPair::from_secs(60, 0))
        .await;
    assert!(!tier.contains("local-only"));
    assert_eq!(cache.get::<Record>("local-only").await, Some(record(6)));

    cache
        .set("distributed-only", &record(7), TtlPair::from_secs(0, 60))
        .await;
    assert_eq!(tier.ttl_of("distributed-only"), Some(60));

    cache.set("nowhere", &record(8), TtlPair::from_secs(0, 0)).await;
    assert!(!tier.contains("nowhere"));
    assert_eq!(tier.sets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_local_entry_expires() {
    let (cache, tier) = setup();
    cache
        .set(
            "short",
            &record(9),
            TtlPair::new(Duration::from_millis(50), Duration::ZERO),
        )
        .await;

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(cache.get::<Record>("short").await, None);
    assert_eq!(tier.gets.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delete_removes_both_tiers() {
    let (cache, tier) = setup();
    cache
        .set("stand:id:10", &record(10), TtlPair::from_secs(600, 1800))
        .await;

    cache.delete("stand:id:10").await;
    cache.delete("stand:id:10").await;

    assert!(!tier.contains("stand:id:10"));
    assert_eq!(cache.get::<Record>("stand:id:10").await, None);
}

#[tokio::test]
async fn test_delete_by_pattern() {
    let (cache, tier) = setup();
    let ttl = TtlPair::from_secs(600, 1800);
    cache.set("stand:high-value:100.00", &record(1), ttl).await;
    cache.set("stand:high-value:150.00", &record(2), ttl).await;
    cache.set("stand:all", &vec![record(1)], ttl).await;

    cache.delete_by_pattern("stand:high-value:*").await;

    assert_eq!(cache.get::<Record>("stand:high-value:100.00").await, None);
    assert_eq!(cache.get::<Record>("stand:high-value:150.00").await, None);
    assert!(!tier.contains("stand:high-value:100.00"));
    assert_eq!(
        cache.get::<Vec<Record>>("stand:all").await,
        Some(vec![record(1)])
    );
}

#[tokio::test]
async fn test_distributed_failure_degrades_to_loader() {
    let (cache, tier) = setup();
    tier.failing.store(true, Ordering::SeqCst);

    assert_eq!(cache.get::<Record>("stand:id:11").await, None);

    let value = cache
        .get_or_load::<_, String, _, _>("stand:id:11", || async { Ok(record(11)) })
        .await
        .unwrap();
    assert_eq!(value, record(11));

    // The local tier still took the write.
    assert_eq!(cache.get::<Record>("stand:id:11").await, Some(record(11)));

    cache.delete("stand:id:11").await;
    cache.delete_by_pattern("stand:*").await;
    assert!(cache.ping_distributed().await.is_err());
}

#[tokio::test]
async fn test_undecodable_distributed_entry_is_a_miss() {
    let (cache, tier) = setup();
    tier.entries
        .lock()
        .unwrap()
        .insert("stand:id:12".to_string(), (b"not json".to_vec(), 60));

    assert_eq!(cache.get::<Record>("stand:id:12").await, None);

    let value = cache
        .get_or_load::<_, String, _, _>("stand:id:12", || async { Ok(record(12)) })
        .await
        .unwrap();
    assert_eq!(value, record(12));
    assert_eq!(cache.get::<Record>("stand:id:12").await, Some(record(12)));
}

#[tokio::test]
async fn test_custom_ttl_reaches_distributed_tier() {
    let (cache, tier) = setup();

    cache
        .get_or_load_with_ttl::<_, String, _, _>(
            "stand:statistics:species",
            TtlPair::from_secs(3600, 7200),
            || async { Ok(vec![record(1)]) },
        )
        .await
        .unwrap();

    assert_eq!(tier.ttl_of("stand:statistics:species"), Some(7200));
}
