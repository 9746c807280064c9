//! String key-value storage behind the stats cache and the like counter.
//!
//! Two backends are provided. [`MemoryStore`] keeps entries in a moka cache
//! for the lifetime of the process and [`FileStore`] writes one file per key
//! so entries survive restarts. A bounded memory store may evict any key, so
//! values that must never be lost get their own store from [`counter_store`].

use async_trait::async_trait;
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use skystats_common::{Result, StatsError};
use skystats_config::StoreBackend;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Read-modify-write callback for [`KvStore::update`].
///
/// Receives the current value (if any) and returns the value to store.
pub type UpdateFn = Box<dyn FnOnce(Option<String>) -> String + Send>;

/// Asynchronous string key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the stored value, or `None` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically replaces the value under `key` with `f(current)` and
    /// returns the new value. Concurrent updates of one key never lose writes.
    async fn update(&self, key: &str, f: UpdateFn) -> Result<String>;
}

/// In-process store backed by a bounded moka cache.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, String>,
}

impl MemoryStore {
    /// Creates a store holding at most `max_capacity` keys.
    pub fn new(max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    /// Creates a store that never evicts.
    pub fn unbounded() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(skystats_config::DEFAULT_MEMORY_CAPACITY)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).await)
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn update(&self, key: &str, f: UpdateFn) -> Result<String> {
        let result = self
            .entries
            .entry(key.to_string())
            .and_compute_with(|current| {
                let next = f(current.map(|entry| entry.into_value()));
                std::future::ready(Op::Put(next))
            })
            .await;

        match result {
            CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) => Ok(entry.into_value()),
            _ => Err(StatsError::store(format!("update of '{key}' stored nothing"))),
        }
    }
}

/// Store keeping one file per key under a directory.
///
/// Writes go to a temporary file first and are renamed into place.
pub struct FileStore {
    directory: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Creates the store, creating `directory` if needed.
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            StatsError::store_with_source(
                format!("Failed to create store directory {}", directory.display()),
                e,
            )
        })?;
        info!("File store rooted at {}", directory.display());
        Ok(Self {
            directory,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the entries.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{name}.json"))
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StatsError::store_with_source(
                format!("Failed to read {}", path.display()),
                e,
            )),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, value).await.map_err(|e| {
            StatsError::store_with_source(format!("Failed to write {}", tmp_path.display()), e)
        })?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(|e| {
            StatsError::store_with_source(format!("Failed to replace {}", path.display()), e)
        })?;
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(key, &value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StatsError::store_with_source(
                format!("Failed to remove {}", path.display()),
                e,
            )),
        }
    }

    async fn update(&self, key: &str, f: UpdateFn) -> Result<String> {
        let _guard = self.write_lock.lock().await;
        let next = f(self.read(key).await?);
        self.write(key, &next).await?;
        Ok(next)
    }
}

/// Builds the configured backend.
#[instrument]
pub async fn build_store(backend: &StoreBackend) -> Result<Arc<dyn KvStore>> {
    match backend {
        StoreBackend::Memory { max_capacity } => {
            info!("Using in-memory store (capacity {})", max_capacity);
            Ok(Arc::new(MemoryStore::new(*max_capacity)))
        }
        StoreBackend::File { directory } => Ok(Arc::new(FileStore::open(directory).await?)),
    }
}

/// Store for counters that must survive cache eviction.
///
/// The file backend keeps every key and is shared as is. The memory backend
/// is bounded, so counters get a separate unbounded map.
pub fn counter_store(backend: &StoreBackend, shared: &Arc<dyn KvStore>) -> Arc<dyn KvStore> {
    match backend {
        StoreBackend::Memory { .. } => Arc::new(MemoryStore::unbounded()),
        StoreBackend::File { .. } => Arc::clone(shared),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise(store: &dyn KvStore) {
        assert_eq!(store.get("stats-alice.bsky.social").await.unwrap(), None);

        store
            .put("stats-alice.bsky.social", "{\"a\":1}".to_string())
            .await
            .unwrap();
        assert_eq!(
            store.get("stats-alice.bsky.social").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );

        let appended = store
            .update(
                "stats-alice.bsky.social",
                Box::new(|current| format!("{}!", current.unwrap_or_default())),
            )
            .await
            .unwrap();
        assert_eq!(appended, "{\"a\":1}!");

        store.delete("stats-alice.bsky.social").await.unwrap();
        store.delete("stats-alice.bsky.social").await.unwrap();
        assert_eq!(store.get("stats-alice.bsky.social").await.unwrap(), None);

        let created = store
            .update("fresh", Box::new(|current| current.unwrap_or_else(|| "0".to_string())))
            .await
            .unwrap();
        assert_eq!(created, "0");
    }

    #[tokio::test]
    async fn test_memory_store_operations() {
        exercise(&MemoryStore::new(16)).await;
    }

    #[tokio::test]
    async fn test_file_store_operations() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store")).await.unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_file_store_keys_stay_inside_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let path = store.path_for("../../etc/passwd");
        assert_eq!(path.parent(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.put("likes", "7".to_string()).await.unwrap();
        }
        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.get("likes").await.unwrap().as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_build_store_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let store = build_store(&StoreBackend::File {
            directory: dir.path().to_path_buf(),
        })
        .await
        .unwrap();
        store.put("k", "v".to_string()).await.unwrap();
        assert!(dir.path().join("k.json").exists());

        let memory = build_store(&StoreBackend::Memory { max_capacity: 4 })
            .await
            .unwrap();
        assert_eq!(memory.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_counter_store_sharing_follows_backend() {
        let dir = tempfile::tempdir().unwrap();
        let file = StoreBackend::File {
            directory: dir.path().to_path_buf(),
        };
        let shared = build_store(&file).await.unwrap();
        counter_store(&file, &shared)
            .put("likes", "3".to_string())
            .await
            .unwrap();
        assert_eq!(shared.get("likes").await.unwrap().as_deref(), Some("3"));

        let memory = StoreBackend::Memory { max_capacity: 4 };
        let shared = build_store(&memory).await.unwrap();
        counter_store(&memory, &shared)
            .put("likes", "3".to_string())
            .await
            .unwrap();
        assert_eq!(shared.get("likes").await.unwrap(), None);
    }
}
