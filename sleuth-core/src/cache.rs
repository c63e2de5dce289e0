//! Two-tier result cache with lazy TTL expiry.
//!
//! - **Memory tier**: `RwLock<HashMap>`, exact-key lookup, lost on restart.
//!   Concurrent writers are last-writer-wins per key.
//! - **Durable tier**: one JSON file per key holding `{data, created_at, ttl_secs}`.
//!   Consulted only on a memory miss. A durable hit is returned as-is and is
//!   not copied into the memory tier.
//!
//! An entry is valid while `now - created_at < ttl`. Expiry is checked on
//! lookup only; an expired entry is removed from whichever tier it was found
//! in and the lookup reports a miss. Missing or unreadable files are misses.

use crate::error::CacheError;
use crate::persistence;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// A cached value with its write time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
}

impl<T> CacheEntry<T> {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        is_fresh(self.created_at, self.ttl_secs, now)
    }
}

fn is_fresh(created_at: DateTime<Utc>, ttl_secs: u64, now: DateTime<Utc>) -> bool {
    let ttl = chrono::Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000));
    now.signed_duration_since(created_at) < ttl
}

#[derive(Serialize)]
struct DurableRecordRef<'a, T> {
    data: &'a T,
    created_at: DateTime<Utc>,
    ttl_secs: u64,
}

#[derive(Deserialize)]
struct DurableRecord<T> {
    data: T,
    created_at: DateTime<Utc>,
    ttl_secs: u64,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
}

impl CacheMetrics {
    /// Hit rate as a fraction (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Key/value cache over a memory tier and an optional durable tier.
pub struct ResultCache<T> {
    memory: RwLock<HashMap<String, CacheEntry<T>>>,
    durable_dir: Option<PathBuf>,
    default_ttl_secs: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T> ResultCache<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// Memory-only cache.
    pub fn in_memory(default_ttl_secs: u64) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            durable_dir: None,
            default_ttl_secs,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Memory tier backed by one file per key under `dir`.
    pub fn with_durable_dir(dir: impl Into<PathBuf>, default_ttl_secs: u64) -> Self {
        Self {
            durable_dir: Some(dir.into()),
            ..Self::in_memory(default_ttl_secs)
        }
    }

    pub fn default_ttl_secs(&self) -> u64 {
        self.default_ttl_secs
    }

    pub fn durable_dir(&self) -> Option<&Path> {
        self.durable_dir.as_deref()
    }

    /// Look up `key`, memory first, then the durable tier.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Utc::now();

        match self.memory_lookup(key, now) {
            MemoryLookup::Hit(value) => {
                debug!(key = %key, tier = "memory", "Cache hit");
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(value);
            }
            MemoryLookup::Expired => {
                let mut memory = self.memory.write().unwrap_or_else(|e| e.into_inner());
                if memory.get(key).is_some_and(|e| !e.is_valid_at(now)) {
                    memory.remove(key);
                    debug!(key = %key, tier = "memory", "Expired cache entry removed");
                }
            }
            MemoryLookup::Absent => {}
        }

        if let Some(value) = self.durable_lookup(key, now) {
            debug!(key = %key, tier = "durable", "Cache hit");
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Some(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store `value` under `key` in both tiers.
    ///
    /// The memory tier is always updated. An error means the durable write failed.
    pub fn put(&self, key: &str, value: T, ttl_secs: u64) -> Result<(), CacheError> {
        let created_at = Utc::now();

        let durable = match self.durable_path(key) {
            Some(path) => {
                let record = DurableRecordRef {
                    data: &value,
                    created_at,
                    ttl_secs,
                };
                persistence::atomic_write_json(&path, &record)
                    .map_err(|source| CacheError::Io {
                        operation: "write",
                        source,
                    })
            }
            None => Ok(()),
        };

        let entry = CacheEntry {
            key: key.to_string(),
            payload: value,
            created_at,
            ttl_secs,
        };
        self.memory
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), entry);

        durable
    }

    /// Store with the cache's default TTL.
    pub fn put_default(&self, key: &str, value: T) -> Result<(), CacheError> {
        self.put(key, value, self.default_ttl_secs)
    }

    /// Remove `key` from both tiers.
    pub fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.memory
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        if let Some(path) = self.durable_path(key) {
            persistence::remove_if_exists(&path).map_err(|source| CacheError::Io {
                operation: "remove",
                source,
            })?;
        }
        Ok(())
    }

    /// Drop every entry from both tiers. Returns the number of durable files removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        self.memory
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        let Some(dir) = &self.durable_dir else {
            return Ok(0);
        };
        let files = persistence::list_json_files(dir).map_err(|source| CacheError::Io {
            operation: "list",
            source,
        })?;
        let mut removed = 0;
        for file in files {
            persistence::remove_if_exists(&file).map_err(|source| CacheError::Io {
                operation: "remove",
                source,
            })?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Number of entries currently held in memory (expired ones included).
    pub fn memory_len(&self) -> usize {
        self.memory.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn contains_in_memory(&self, key: &str) -> bool {
        self.memory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Whether a durable file currently exists for `key`.
    pub fn contains_durable(&self, key: &str) -> bool {
        self.durable_path(key).is_some_and(|p| p.exists())
    }

    pub fn metrics(&self) -> CacheMetrics {
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn memory_lookup(&self, key: &str, now: DateTime<Utc>) -> MemoryLookup<T> {
        let memory = self.memory.read().unwrap_or_else(|e| e.into_inner());
        match memory.get(key) {
            Some(entry) if entry.is_valid_at(now) => MemoryLookup::Hit(entry.payload.clone()),
            Some(_) => MemoryLookup::Expired,
            None => MemoryLookup::Absent,
        }
    }

    fn durable_lookup(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let path = self.durable_path(key)?;
        match persistence::load_json::<DurableRecord<T>>(&path) {
            Ok(Some(record)) if is_fresh(record.created_at, record.ttl_secs, now) => {
                Some(record.data)
            }
            Ok(Some(_)) => {
                if let Err(e) = persistence::remove_if_exists(&path) {
                    warn!(key = %key, error = %e, "Failed to remove expired cache file");
                } else {
                    debug!(key = %key, tier = "durable", "Expired cache entry removed");
                }
                None
            }
            Ok(None) => None,
            Err(e) => {
                debug!(key = %key, error = %e, "Unreadable cache file treated as miss");
                None
            }
        }
    }

    fn durable_path(&self, key: &str) -> Option<PathBuf> {
        let dir = self.durable_dir.as_ref()?;
        Some(dir.join(format!("{}.json", file_stem(key))))
    }
}

enum MemoryLookup<T> {
    Hit(T),
    Expired,
    Absent,
}

/// Keys made of `[A-Za-z0-9_-]` are used verbatim as file names; anything else is hashed.
fn file_stem(key: &str) -> String {
    let safe = !key.is_empty()
        && key.len() <= 128
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe { key.to_string() } else { hex_sha256(key.as_bytes()) }
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Deterministic cache key for `(topic, options)`.
///
/// The topic is whitespace-collapsed and lowercased; the options are
/// serialized to JSON with object keys sorted at every level, so field order
/// never affects the key.
pub fn cache_key<O: Serialize>(topic: &str, options: &O) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(options)?;
    Ok(cache_key_from_value(topic, &value))
}

/// [`cache_key`] over an already-serialized options value.
pub fn cache_key_from_value(topic: &str, options: &serde_json::Value) -> String {
    let topic = topic
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let mut canonical = String::new();
    write_canonical(options, &mut canonical);
    hex_sha256(format!("{topic}\u{1f}{canonical}").as_bytes())
}

fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_put_then_get_memory() {
        let cache: ResultCache<String> = ResultCache::in_memory(60);
        cache.put("k", "v".to_string(), 60).unwrap();
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert_eq!(cache.metrics().hits, 1);
    }

    #[test]
    fn test_miss_is_counted() {
        let cache: ResultCache<String> = ResultCache::in_memory(60);
        assert!(cache.get("absent").is_none());
        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hit_rate(), 0.0);
    }

    #[test]
    fn test_zero_ttl_expires_in_both_tiers() {
        let dir = TempDir::new().unwrap();
        let cache: ResultCache<String> = ResultCache::with_durable_dir(dir.path(), 60);
        cache.put("k", "v".to_string(), 0).unwrap();
        assert!(cache.contains_in_memory("k"));
        assert!(cache.contains_durable("k"));

        assert!(cache.get("k").is_none());
        assert!(!cache.contains_in_memory("k"));
        assert!(!cache.contains_durable("k"));
    }

    #[test]
    fn test_entry_expires_after_ttl_elapses() {
        let dir = TempDir::new().unwrap();
        let cache: ResultCache<u32> = ResultCache::with_durable_dir(dir.path(), 60);
        cache.put("k", 7, 1).unwrap();
        assert_eq!(cache.get("k"), Some(7));

        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert_eq!(cache.get("k"), None);
        assert!(!cache.contains_in_memory("k"));
        assert!(!cache.contains_durable("k"));
    }

    #[test]
    fn test_durable_hit_is_not_promoted() {
        let dir = TempDir::new().unwrap();
        let writer: ResultCache<String> = ResultCache::with_durable_dir(dir.path(), 60);
        writer.put("k", "persisted".to_string(), 60).unwrap();

        // Fresh process: empty memory tier, same directory.
        let reader: ResultCache<String> = ResultCache::with_durable_dir(dir.path(), 60);
        assert_eq!(reader.get("k").as_deref(), Some("persisted"));
        assert!(!reader.contains_in_memory("k"));
    }

    #[test]
    fn test_corrupt_durable_file_is_miss() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("k.json"), b"{broken").unwrap();
        let cache: ResultCache<String> = ResultCache::with_durable_dir(dir.path(), 60);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_durable_write_failure_still_fills_memory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();
        let cache: ResultCache<String> = ResultCache::with_durable_dir(&blocker, 60);

        let result = cache.put("k", "v".to_string(), 60);
        assert!(matches!(result, Err(CacheError::Io { .. })));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_last_writer_wins() {
        let cache: ResultCache<u32> = ResultCache::in_memory(60);
        cache.put("k", 1, 60).unwrap();
        cache.put("k", 2, 60).unwrap();
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.memory_len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let dir = TempDir::new().unwrap();
        let cache: ResultCache<u32> = ResultCache::with_durable_dir(dir.path(), 60);
        cache.put_default("a", 1).unwrap();
        cache.put_default("b", 2).unwrap();

        cache.invalidate("a").unwrap();
        assert!(cache.get("a").is_none());
        assert_eq!(cache.clear().unwrap(), 1);
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_unsafe_keys_are_hashed_for_files() {
        assert_eq!(file_stem("abc-123_x"), "abc-123_x");
        let hashed = file_stem("../../etc/passwd");
        assert_eq!(hashed.len(), 64);
        assert!(hashed.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_ignores_field_order() {
        let a = json!({"max_sources": 5, "nested": {"x": 1, "y": [1, 2]}, "tone": "neutral"});
        let b: serde_json::Value =
            serde_json::from_str(r#"{"tone":"neutral","nested":{"y":[1,2],"x":1},"max_sources":5}"#)
                .unwrap();
        assert_eq!(
            cache_key_from_value("Rust  Async", &a),
            cache_key_from_value("rust async", &b)
        );
    }

    #[test]
    fn test_cache_key_distinguishes_values() {
        let a = json!({"max_sources": 5});
        let b = json!({"max_sources": 6});
        assert_ne!(cache_key_from_value("t", &a), cache_key_from_value("t", &b));
        assert_ne!(cache_key_from_value("t1", &a), cache_key_from_value("t2", &a));
    }
}
