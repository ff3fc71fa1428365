//! # PWAKit Cache
//!
//! Partitioned response cache for the PWAKit offline-worker toolkit.
//!
//! ## Features
//!
//! - **Named partitions**: one *static* and one *dynamic* partition per
//!   deployment generation
//! - **Generation naming**: bulk invalidation by partition-name prefix
//! - **Last-write-wins**: one entry per request key, no per-entry expiry
//! - **`CacheStore` trait**: the store is injected into the router, so tests
//!   can substitute their own instance
//!
//! ## Architecture
//!
//! ```text
//! CacheStore
//!     ├── "static-v3"   (shell assets, populated at install)
//!     │       └── request key → CacheEntry
//!     └── "dynamic-v3"  (populated from successful runtime fetches)
//!             └── request key → CacheEntry
//! ```

use async_trait::async_trait;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::trace;

// ==================== Errors ====================

/// Errors that can occur in cache store operations.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("Partition not found: {0}")]
    PartitionNotFound(String),

    #[error("Store error: {0}")]
    Backend(String),
}

// ==================== Keys ====================

/// Build the request key a response is stored under.
///
/// Keys are method + URL; cacheable traffic is effectively GET-only, the
/// method is kept in the key so nothing else can ever collide with it.
pub fn request_key(method: &str, url: &str) -> String {
    format!("{} {}", method, url)
}

// ==================== Generation Names ====================

/// Partition naming for one deployment generation.
///
/// The generation token is the sole cache-invalidation mechanism: partitions
/// whose name does not belong to the current generation are deleted when a
/// new worker activates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    generation: String,
}

impl CacheNames {
    /// Create names for a generation token (e.g. `"v3"`).
    pub fn new(generation: impl Into<String>) -> Self {
        Self {
            generation: generation.into(),
        }
    }

    /// The generation token.
    pub fn generation(&self) -> &str {
        &self.generation
    }

    /// Name of the static (install-time) partition.
    pub fn static_partition(&self) -> String {
        format!("static-{}", self.generation)
    }

    /// Name of the dynamic (runtime) partition.
    pub fn dynamic_partition(&self) -> String {
        format!("dynamic-{}", self.generation)
    }

    /// Check whether a partition name belongs to this generation.
    pub fn owns(&self, partition: &str) -> bool {
        partition == self.static_partition() || partition == self.dynamic_partition()
    }
}

// ==================== Entries ====================

/// A cached request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request URL.
    pub url: String,

    /// Request method.
    pub method: String,

    /// Response status.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body.
    pub body: Vec<u8>,

    /// Stored-at timestamp (ms since epoch).
    pub stored_at: u64,
}

impl CacheEntry {
    /// Create an entry for a GET response.
    pub fn new(url: impl Into<String>, status: u16, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            status,
            headers: HashMap::new(),
            body,
            stored_at: now_millis(),
        }
    }

    /// The key this entry is stored under.
    pub fn key(&self) -> String {
        request_key(&self.method, &self.url)
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ==================== Store Trait ====================

/// A partitioned response cache.
///
/// Implementations must be safe for concurrent routing tasks; writes to the
/// same key are last-write-wins under the store's own lock, which is
/// acceptable because cached bodies are idempotent GET results.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a partition, creating it if absent.
    async fn open(&self, partition: &str) -> Result<(), CacheError>;

    /// Check whether a partition exists.
    async fn has(&self, partition: &str) -> bool;

    /// Delete a partition and everything in it. Returns whether it existed.
    async fn delete(&self, partition: &str) -> Result<bool, CacheError>;

    /// Names of all existing partitions.
    async fn partition_names(&self) -> Vec<String>;

    /// Store an entry, overwriting any prior entry for the same key.
    async fn put(&self, partition: &str, entry: CacheEntry) -> Result<(), CacheError>;

    /// Exact-match lookup in one partition.
    async fn match_key(&self, partition: &str, key: &str)
        -> Result<Option<CacheEntry>, CacheError>;

    /// Exact-match lookup across all partitions.
    async fn match_any(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// All keys in a partition.
    async fn keys(&self, partition: &str) -> Result<Vec<String>, CacheError>;

    /// Number of entries in a partition.
    async fn entry_count(&self, partition: &str) -> Result<usize, CacheError>;
}

// ==================== In-Memory Store ====================

/// In-memory `CacheStore` implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<HashMap<String, HashMap<String, CacheEntry>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, partition: &str) -> Result<(), CacheError> {
        let mut partitions = self.partitions.write().await;
        partitions.entry(partition.to_string()).or_default();
        Ok(())
    }

    async fn has(&self, partition: &str) -> bool {
        self.partitions.read().await.contains_key(partition)
    }

    async fn delete(&self, partition: &str) -> Result<bool, CacheError> {
        let mut partitions = self.partitions.write().await;
        Ok(partitions.remove(partition).is_some())
    }

    async fn partition_names(&self) -> Vec<String> {
        self.partitions.read().await.keys().cloned().collect()
    }

    async fn put(&self, partition: &str, entry: CacheEntry) -> Result<(), CacheError> {
        let mut partitions = self.partitions.write().await;
        let entries = partitions
            .get_mut(partition)
            .ok_or_else(|| CacheError::PartitionNotFound(partition.to_string()))?;
        trace!(partition, key = %entry.key(), "cache put");
        entries.insert(entry.key(), entry);
        Ok(())
    }

    async fn match_key(
        &self,
        partition: &str,
        key: &str,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let partitions = self.partitions.read().await;
        let entries = partitions
            .get(partition)
            .ok_or_else(|| CacheError::PartitionNotFound(partition.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn match_any(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let partitions = self.partitions.read().await;
        // Sorted partition order keeps lookups deterministic when the same
        // key exists in more than one partition.
        let mut names: Vec<&String> = partitions.keys().collect();
        names.sort();
        for name in names {
            if let Some(entry) = partitions[name].get(key) {
                return Ok(Some(entry.clone()));
            }
        }
        Ok(None)
    }

    async fn keys(&self, partition: &str) -> Result<Vec<String>, CacheError> {
        let partitions = self.partitions.read().await;
        let entries = partitions
            .get(partition)
            .ok_or_else(|| CacheError::PartitionNotFound(partition.to_string()))?;
        Ok(entries.keys().cloned().collect())
    }

    async fn entry_count(&self, partition: &str) -> Result<usize, CacheError> {
        let partitions = self.partitions.read().await;
        let entries = partitions
            .get(partition)
            .ok_or_else(|| CacheError::PartitionNotFound(partition.to_string()))?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_names() {
        let names = CacheNames::new("v2");
        assert_eq!(names.static_partition(), "static-v2");
        assert_eq!(names.dynamic_partition(), "dynamic-v2");
        assert!(names.owns("static-v2"));
        assert!(names.owns("dynamic-v2"));
        assert!(!names.owns("static-v1"));
        assert!(!names.owns("dynamic-v3"));
    }

    #[test]
    fn test_request_key_includes_method() {
        let key = request_key("GET", "https://example.com/app.js");
        assert_eq!(key, "GET https://example.com/app.js");
    }

    #[tokio::test]
    async fn test_put_requires_open_partition() {
        let store = MemoryStore::new();
        let entry = CacheEntry::new("https://example.com/a.css", 200, Vec::new());

        let result = store.put("static-v1", entry).await;
        assert!(matches!(result, Err(CacheError::PartitionNotFound(_))));
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let store = MemoryStore::new();
        store.open("static-v1").await.unwrap();

        let entry = CacheEntry::new("https://example.com/a.css", 200, b"body{}".to_vec());
        let key = entry.key();
        store.put("static-v1", entry).await.unwrap();

        let hit = store.match_key("static-v1", &key).await.unwrap();
        assert_eq!(hit.unwrap().body, b"body{}");

        let miss = store
            .match_key("static-v1", "GET https://example.com/b.css")
            .await
            .unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let store = MemoryStore::new();
        store.open("dynamic-v1").await.unwrap();

        let first = CacheEntry::new("https://example.com/logo.png", 200, vec![1]);
        let second = CacheEntry::new("https://example.com/logo.png", 200, vec![2]);
        let key = first.key();

        store.put("dynamic-v1", first).await.unwrap();
        store.put("dynamic-v1", second).await.unwrap();

        assert_eq!(store.entry_count("dynamic-v1").await.unwrap(), 1);
        let hit = store.match_key("dynamic-v1", &key).await.unwrap().unwrap();
        assert_eq!(hit.body, vec![2]);
    }

    #[tokio::test]
    async fn test_match_any_across_partitions() {
        let store = MemoryStore::new();
        store.open("static-v1").await.unwrap();
        store.open("dynamic-v1").await.unwrap();

        let entry = CacheEntry::new("https://example.com/index.html", 200, b"<html>".to_vec());
        let key = entry.key();
        store.put("static-v1", entry).await.unwrap();

        let hit = store.match_any(&key).await.unwrap();
        assert_eq!(hit.unwrap().url, "https://example.com/index.html");

        let miss = store.match_any("GET https://example.com/other").await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_delete_partition() {
        let store = MemoryStore::new();
        store.open("static-v1").await.unwrap();

        assert!(store.has("static-v1").await);
        assert!(store.delete("static-v1").await.unwrap());
        assert!(!store.has("static-v1").await);
        assert!(!store.delete("static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_partition_names() {
        let store = MemoryStore::new();
        store.open("static-v1").await.unwrap();
        store.open("dynamic-v1").await.unwrap();

        let mut names = store.partition_names().await;
        names.sort();
        assert_eq!(names, vec!["dynamic-v1", "static-v1"]);
    }
}
