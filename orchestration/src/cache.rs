//! Result cache over a [`KeyValueStore`].
//!
//! Entries are keyed purely by [`RequestFingerprint`] under a shared prefix,
//! hold one artifact each (last write wins), and expire after a fixed
//! retention window.
//!
//! - `lookup` never writes: an expired entry is a miss and stays in the store
//!   until the next housekeeping pass.
//! - `store` is best effort. Expired entries are purged after every write
//!   attempt, whether the write succeeded, hit the capacity limit or failed
//!   outright. No failure reaches the caller.
//!
//! Concurrent `lookup`-then-`store` for the same fingerprint may race; the
//! later write wins.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fingerprint::RequestFingerprint;
use crate::store::{KeyValueStore, StoreError};

/// Key prefix shared by every cache entry.
pub const CACHE_PREFIX: &str = "pm_designer_image_";

/// Default retention window.
pub fn default_retention() -> Duration {
    Duration::days(7)
}

/// A previously produced result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedArtifact {
    pub fingerprint: RequestFingerprint,
    /// Opaque payload, e.g. an image data URI or validated JSON.
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub expires_after_secs: i64,
}

impl CachedArtifact {
    pub fn new(
        fingerprint: RequestFingerprint,
        payload: impl Into<String>,
        created_at: DateTime<Utc>,
        retention: Duration,
    ) -> Self {
        Self {
            fingerprint,
            payload: payload.into(),
            created_at,
            expires_after_secs: retention.num_seconds(),
        }
    }

    pub fn expires_after(&self) -> Duration {
        Duration::seconds(self.expires_after_secs)
    }

    /// Expired once its age exceeds the retention window.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > self.expires_after()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub total_bytes: usize,
}

pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    retention: Duration,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("retention", &self.retention)
            .finish_non_exhaustive()
    }
}

impl ResultCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            retention: default_retention(),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn key_for(fingerprint: &RequestFingerprint) -> String {
        format!("{CACHE_PREFIX}{fingerprint}")
    }

    pub fn lookup(&self, fingerprint: &RequestFingerprint) -> Option<CachedArtifact> {
        self.lookup_at(fingerprint, Utc::now())
    }

    /// Lookup as of `now`. Read errors and unreadable entries are misses.
    pub fn lookup_at(
        &self,
        fingerprint: &RequestFingerprint,
        now: DateTime<Utc>,
    ) -> Option<CachedArtifact> {
        let key = Self::key_for(fingerprint);
        let raw = match self.store.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(%fingerprint, error = %err, "cache read failed; treating as miss");
                return None;
            }
        };

        let artifact: CachedArtifact = match serde_json::from_str(&raw) {
            Ok(artifact) => artifact,
            Err(err) => {
                debug!(%fingerprint, error = %err, "unreadable cache entry; treating as miss");
                return None;
            }
        };

        if artifact.is_expired_at(now) {
            debug!(%fingerprint, "cache entry expired");
            return None;
        }
        debug!(%fingerprint, "cache hit");
        Some(artifact)
    }

    pub fn store(&self, fingerprint: &RequestFingerprint, payload: &str) {
        self.store_at(fingerprint, payload, Utc::now())
    }

    /// Store as of `now`, then run housekeeping.
    pub fn store_at(&self, fingerprint: &RequestFingerprint, payload: &str, now: DateTime<Utc>) {
        let artifact = CachedArtifact::new(fingerprint.clone(), payload, now, self.retention);
        let encoded = match serde_json::to_string(&artifact) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(%fingerprint, error = %err, "cache entry could not be encoded");
                return;
            }
        };

        match self.store.set(&Self::key_for(fingerprint), &encoded) {
            Ok(()) => {
                debug!(%fingerprint, bytes = encoded.len(), "cache store");
            }
            Err(err) if err.is_quota() => {
                warn!(%fingerprint, error = %err, "cache full; purging expired entries and dropping write");
            }
            Err(err) => {
                warn!(%fingerprint, error = %err, "cache write failed; dropping write");
            }
        }

        if let Err(err) = self.purge_expired(now) {
            warn!(error = %err, "cache housekeeping failed");
        }
    }

    /// Remove expired and unreadable entries, oldest first.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut expired: Vec<(Option<DateTime<Utc>>, String)> = Vec::new();
        for key in self.cache_keys()? {
            let Some(raw) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<CachedArtifact>(&raw) {
                Ok(artifact) if artifact.is_expired_at(now) => {
                    expired.push((Some(artifact.created_at), key))
                }
                Ok(_) => {}
                Err(_) => expired.push((None, key)),
            }
        }

        // Unreadable entries sort first (None < Some), then by age.
        expired.sort();
        for (_, key) in &expired {
            self.store.remove(key)?;
        }
        if !expired.is_empty() {
            info!(removed = expired.len(), "purged expired cache entries");
        }
        Ok(expired.len())
    }

    /// Remove every cache entry regardless of age.
    pub fn clear_all(&self) -> Result<usize, StoreError> {
        let keys = self.cache_keys()?;
        for key in &keys {
            self.store.remove(key)?;
        }
        info!(removed = keys.len(), "cleared result cache");
        Ok(keys.len())
    }

    pub fn stats(&self) -> Result<CacheStats, StoreError> {
        let mut stats = CacheStats::default();
        for key in self.cache_keys()? {
            if let Some(raw) = self.store.get(&key)? {
                stats.count += 1;
                stats.total_bytes += raw.len();
            }
        }
        Ok(stats)
    }

    fn cache_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(CACHE_PREFIX))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cache() -> (Arc<MemoryStore>, ResultCache) {
        let store = Arc::new(MemoryStore::new());
        let cache = ResultCache::new(store.clone());
        (store, cache)
    }

    fn fp(prompt: &str) -> RequestFingerprint {
        RequestFingerprint::for_image(prompt, "1:1", None)
    }

    #[test]
    fn round_trip() {
        let (_, cache) = cache();
        let now = Utc::now();
        cache.store_at(&fp("a red bicycle"), "data:image/png;base64,AAAA", now);
        let hit = cache.lookup_at(&fp("a red bicycle"), now).unwrap();
        assert_eq!(hit.payload, "data:image/png;base64,AAAA");
        assert_eq!(hit.fingerprint, fp("a red bicycle"));
    }

    #[test]
    fn expired_is_miss_but_not_removed() {
        let (store, cache) = cache();
        let then = Utc::now();
        cache.store_at(&fp("x"), "payload", then);
        let later = then + Duration::days(7) + Duration::seconds(1);
        assert!(cache.lookup_at(&fp("x"), later).is_none());
        assert!(store.get(&ResultCache::key_for(&fp("x"))).unwrap().is_some());
    }

    #[test]
    fn exactly_at_retention_is_still_fresh() {
        let (_, cache) = cache();
        let then = Utc::now();
        cache.store_at(&fp("x"), "payload", then);
        assert!(cache.lookup_at(&fp("x"), then + Duration::days(7)).is_some());
    }

    #[test]
    fn last_write_wins() {
        let (_, cache) = cache();
        let now = Utc::now();
        cache.store_at(&fp("x"), "first", now);
        cache.store_at(&fp("x"), "second", now);
        assert_eq!(cache.lookup_at(&fp("x"), now).unwrap().payload, "second");
        assert_eq!(cache.stats().unwrap().count, 1);
    }

    #[test]
    fn store_purges_expired_and_unreadable_entries() {
        let (store, cache) = cache();
        let old = Utc::now() - Duration::days(30);
        cache.store_at(&fp("old"), "stale", old);
        store.set(&format!("{CACHE_PREFIX}garbage"), "not json").unwrap();
        store.set("gemini_api_key", "AIza-not-a-cache-entry").unwrap();

        cache.store(&fp("new"), "fresh");

        let keys = store.keys().unwrap();
        assert_eq!(keys.iter().filter(|k| k.starts_with(CACHE_PREFIX)).count(), 1);
        assert!(keys.contains(&"gemini_api_key".to_string()));
    }

    #[test]
    fn quota_failure_is_swallowed_after_purge() {
        let store = Arc::new(MemoryStore::with_capacity(600));
        let cache = ResultCache::new(store.clone());
        let old = Utc::now() - Duration::days(30);
        cache.store_at(&fp("old"), "x".repeat(200).as_str(), old);
        assert_eq!(cache.stats().unwrap().count, 1);

        cache.store(&fp("huge"), &"y".repeat(1_000));

        assert!(cache.lookup(&fp("huge")).is_none());
        assert_eq!(cache.stats().unwrap().count, 0);
    }

    /// Rejects every write with an I/O error; reads and removals pass through.
    struct ReadOnlyStore(MemoryStore);

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.get(key)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.0.remove(key)
        }
        fn keys(&self) -> Result<Vec<String>, StoreError> {
            self.0.keys()
        }
    }

    #[test]
    fn failed_write_still_purges_expired() {
        let inner = MemoryStore::new();
        let old = Utc::now() - Duration::days(30);
        let stale = CachedArtifact::new(fp("old"), "stale", old, default_retention());
        inner
            .set(&ResultCache::key_for(&fp("old")), &serde_json::to_string(&stale).unwrap())
            .unwrap();
        let cache = ResultCache::new(Arc::new(ReadOnlyStore(inner)));
        assert_eq!(cache.stats().unwrap().count, 1);

        cache.store(&fp("new"), "fresh");

        assert!(cache.lookup(&fp("new")).is_none());
        assert_eq!(cache.stats().unwrap().count, 0);
    }

    #[test]
    fn clear_all_only_touches_cache_keys() {
        let (store, cache) = cache();
        cache.store(&fp("a"), "1");
        cache.store(&fp("b"), "2");
        store.set("gemini_api_key", "k").unwrap();
        assert_eq!(cache.clear_all().unwrap(), 2);
        assert_eq!(store.keys().unwrap(), vec!["gemini_api_key".to_string()]);
    }
}
