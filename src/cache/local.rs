//! In-process cache tier using moka.
//!
//! Entries are bounded by count (`max_capacity`) and expire on whichever comes first:
//! their own write TTL, or the tier-wide idle timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;

use crate::cache::pattern::KeyPattern;
use crate::config::settings::LocalCacheConfig;

#[derive(Clone)]
struct LocalEntry {
    bytes: Arc<[u8]>,
    ttl: Duration,
}

/// Expires each entry `ttl` after it was last written. Reads don't extend it.
struct WriteTtl;

impl Expiry<String, LocalEntry> for WriteTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &LocalEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &LocalEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Size- and time-bounded local tier holding serialized values.
pub struct LocalTier {
    store: Cache<String, LocalEntry>,
}

impl LocalTier {
    pub fn new(config: &LocalCacheConfig) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(WriteTtl);

        if config.time_to_idle_seconds > 0 {
            builder = builder.time_to_idle(Duration::from_secs(config.time_to_idle_seconds));
        }

        Self {
            store: builder.build(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        self.store.get(key).map(|entry| entry.bytes)
    }

    /// Store `bytes` under `key` for `ttl`. A zero `ttl` is ignored.
    pub fn insert(&self, key: &str, bytes: Arc<[u8]>, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.store.insert(key.to_string(), LocalEntry { bytes, ttl });
    }

    pub fn remove(&self, key: &str) {
        self.store.invalidate(key);
    }

    /// Remove every key matching `pattern`, returning how many were removed.
    ///
    /// Scans the whole key space; acceptable because the tier is capacity-bounded.
    pub fn remove_matching(&self, pattern: &KeyPattern) -> usize {
        let matching: Vec<Arc<String>> = self
            .store
            .iter()
            .filter(|(key, _)| pattern.matches(key))
            .map(|(key, _)| key)
            .collect();

        for key in &matching {
            self.store.invalidate(key.as_str());
        }

        matching.len()
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.store.run_pending_tasks();
        self.store.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier() -> LocalTier {
        LocalTier::new(&LocalCacheConfig {
            max_capacity: 100,
            time_to_idle_seconds: 0,
        })
    }

    fn bytes(s: &str) -> Arc<[u8]> {
        Arc::from(s.as_bytes())
    }

    #[test]
    fn test_insert_and_get() {
        let local = tier();
        local.insert("stand:id:1", bytes("{}"), Duration::from_secs(60));
        assert_eq!(local.get("stand:id:1").as_deref(), Some("{}".as_bytes()));
        assert!(local.get("stand:id:2").is_none());
    }

    #[test]
    fn test_zero_ttl_is_ignored() {
        let local = tier();
        local.insert("stand:id:1", bytes("{}"), Duration::ZERO);
        assert!(local.get("stand:id:1").is_none());
    }

    #[test]
    fn test_entry_expires_after_its_ttl() {
        let local = tier();
        local.insert("short", bytes("1"), Duration::from_millis(50));
        local.insert("long", bytes("2"), Duration::from_secs(60));

        std::thread::sleep(Duration::from_millis(120));

        assert!(local.get("short").is_none());
        assert!(local.get("long").is_some());
    }

    #[test]
    fn test_remove_matching() {
        let local = tier();
        let ttl = Duration::from_secs(60);
        local.insert("stand:high-value:100.00", bytes("1"), ttl);
        local.insert("stand:high-value:200.00", bytes("2"), ttl);
        local.insert("stand:all", bytes("3"), ttl);

        let pattern = KeyPattern::new("stand:high-value:*").unwrap();
        assert_eq!(local.remove_matching(&pattern), 2);

        assert!(local.get("stand:high-value:100.00").is_none());
        assert!(local.get("stand:high-value:200.00").is_none());
        assert!(local.get("stand:all").is_some());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let local = tier();
        local.remove("missing");
        local.insert("k", bytes("1"), Duration::from_secs(60));
        local.remove("k");
        local.remove("k");
        assert!(local.get("k").is_none());
    }
}
