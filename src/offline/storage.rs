//! Named cache partitions: the key-value byte store behind the manager.
//!
//! A [`CacheStorage`] holds partitions by name; a [`CachePartition`] maps
//! request keys to responses. Partition names carry the generation tag, so
//! deleting a partition is how a generation is retired.

use crate::error::SuiteError;
use crate::offline::fetch::CachedResponse;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One named partition.
#[async_trait]
pub trait CachePartition: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, SuiteError>;

    /// Insert or overwrite the entry for `key`.
    async fn put(&self, key: &str, response: &CachedResponse) -> Result<(), SuiteError>;

    async fn keys(&self) -> Result<Vec<String>, SuiteError>;
}

/// The set of partitions.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open `name`, creating an empty partition if it does not exist.
    async fn open(&self, name: &str) -> Result<Arc<dyn CachePartition>, SuiteError>;

    /// Open `name` only if it exists. Never creates a partition.
    async fn get(&self, name: &str) -> Result<Option<Arc<dyn CachePartition>>, SuiteError>;

    async fn has(&self, name: &str) -> Result<bool, SuiteError>;

    /// Delete a whole partition. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, SuiteError>;

    /// Partition names in lookup order.
    async fn keys(&self) -> Result<Vec<String>, SuiteError>;

    /// Search every partition, in [`keys`](Self::keys) order, for `key`.
    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, SuiteError> {
        for name in self.keys().await? {
            // Deleted since `keys()` ran.
            let Some(partition) = self.get(&name).await? else {
                continue;
            };
            if let Some(hit) = partition.lookup(key).await? {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }
}

// ── In-memory implementation ─────────────────────────────────────────────

/// Partition held in memory; entries keep insertion order.
pub struct MemoryPartition {
    name: String,
    entries: RwLock<Vec<(String, CachedResponse)>>,
}

#[async_trait]
impl CachePartition for MemoryPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, SuiteError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone()))
    }

    async fn put(&self, key: &str, response: &CachedResponse) -> Result<(), SuiteError> {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = response.clone(),
            None => entries.push((key.to_string(), response.clone())),
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, SuiteError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().map(|(k, _)| k.clone()).collect())
    }
}

/// Process-local storage; partitions are looked up in creation order.
#[derive(Default, Clone)]
pub struct MemoryCacheStorage {
    partitions: Arc<RwLock<Vec<Arc<MemoryPartition>>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CachePartition>, SuiteError> {
        let mut partitions = self.partitions.write().await;
        if let Some(p) = partitions.iter().find(|p| p.name == name) {
            return Ok(Arc::clone(p) as Arc<dyn CachePartition>);
        }
        let p = Arc::new(MemoryPartition {
            name: name.to_string(),
            entries: RwLock::new(Vec::new()),
        });
        partitions.push(Arc::clone(&p));
        Ok(p as Arc<dyn CachePartition>)
    }

    async fn get(&self, name: &str) -> Result<Option<Arc<dyn CachePartition>>, SuiteError> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|p| p.name == name)
            .map(|p| Arc::clone(p) as Arc<dyn CachePartition>))
    }

    async fn has(&self, name: &str) -> Result<bool, SuiteError> {
        Ok(self.partitions.read().await.iter().any(|p| p.name == name))
    }

    async fn delete(&self, name: &str) -> Result<bool, SuiteError> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|p| p.name != name);
        Ok(partitions.len() != before)
    }

    async fn keys(&self) -> Result<Vec<String>, SuiteError> {
        Ok(self
            .partitions
            .read()
            .await
            .iter()
            .map(|p| p.name.clone())
            .collect())
    }
}
