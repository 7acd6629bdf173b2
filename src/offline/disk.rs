//! Filesystem-backed cache storage.
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   silentsuite-v1/
//!     <sha256(key)>.json   entry metadata (key, status, type, headers)
//!     <sha256(key)>.body   raw response body
//! ```
//!
//! Each file is written to a temp file in the same directory and renamed
//! into place, so a crash never leaves a torn entry. The body is renamed
//! before the metadata: metadata present implies body present.

use crate::error::SuiteError;
use crate::offline::fetch::{CachedResponse, ResponseType};
use crate::offline::storage::{CachePartition, CacheStorage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    key: String,
    url: String,
    status: u16,
    response_type: ResponseType,
    headers: Vec<(String, String)>,
}

fn entry_stem(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn storage_err(partition: &str, detail: impl std::fmt::Display) -> SuiteError {
    SuiteError::Storage {
        partition: partition.to_string(),
        detail: detail.to_string(),
    }
}

/// Partition names become directory names, so only a safe alphabet passes.
fn validate_name(name: &str) -> Result<(), SuiteError> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(storage_err(name, "partition names must match [A-Za-z0-9._-]+"))
    }
}

/// Write `bytes` to `path` atomically via a sibling temp file.
async fn write_atomic(path: PathBuf, bytes: Vec<u8>) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}

/// One partition directory.
pub struct DiskPartition {
    name: String,
    dir: PathBuf,
}

#[async_trait]
impl CachePartition for DiskPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, SuiteError> {
        let stem = entry_stem(key);
        let meta_path = self.dir.join(format!("{stem}.json"));
        let raw = match tokio::fs::read(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_err(&self.name, e)),
        };
        let meta: EntryMeta =
            serde_json::from_slice(&raw).map_err(|e| storage_err(&self.name, e))?;
        let body = tokio::fs::read(self.dir.join(format!("{stem}.body")))
            .await
            .map_err(|e| storage_err(&self.name, e))?;
        Ok(Some(CachedResponse {
            url: meta.url,
            status: meta.status,
            response_type: meta.response_type,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(&self, key: &str, response: &CachedResponse) -> Result<(), SuiteError> {
        let stem = entry_stem(key);
        let meta = EntryMeta {
            key: key.to_string(),
            url: response.url.clone(),
            status: response.status,
            response_type: response.response_type,
            headers: response.headers.clone(),
        };
        let meta_bytes = serde_json::to_vec_pretty(&meta).map_err(|e| storage_err(&self.name, e))?;

        write_atomic(self.dir.join(format!("{stem}.body")), response.body.clone())
            .await
            .map_err(|e| storage_err(&self.name, e))?;
        write_atomic(self.dir.join(format!("{stem}.json")), meta_bytes)
            .await
            .map_err(|e| storage_err(&self.name, e))?;

        debug!("[{}] stored {} ({} bytes)", self.name, key, response.body.len());
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, SuiteError> {
        let mut rd = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| storage_err(&self.name, e))?;
        let mut metas = Vec::new();
        while let Some(entry) = rd.next_entry().await.map_err(|e| storage_err(&self.name, e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                metas.push(path);
            }
        }
        metas.sort();

        let mut keys = Vec::with_capacity(metas.len());
        for path in metas {
            let raw = tokio::fs::read(&path)
                .await
                .map_err(|e| storage_err(&self.name, e))?;
            let meta: EntryMeta =
                serde_json::from_slice(&raw).map_err(|e| storage_err(&self.name, e))?;
            keys.push(meta.key);
        }
        Ok(keys)
    }
}

/// Storage rooted at a directory; partitions are looked up in name order.
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CachePartition>, SuiteError> {
        validate_name(name)?;
        let dir = self.root.join(name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_err(name, e))?;
        Ok(Arc::new(DiskPartition {
            name: name.to_string(),
            dir,
        }) as Arc<dyn CachePartition>)
    }

    async fn get(&self, name: &str) -> Result<Option<Arc<dyn CachePartition>>, SuiteError> {
        if !self.has(name).await? {
            return Ok(None);
        }
        Ok(Some(Arc::new(DiskPartition {
            name: name.to_string(),
            dir: self.root.join(name),
        }) as Arc<dyn CachePartition>))
    }

    async fn has(&self, name: &str) -> Result<bool, SuiteError> {
        validate_name(name)?;
        match tokio::fs::metadata(self.root.join(name)).await {
            Ok(m) => Ok(m.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_err(name, e)),
        }
    }

    async fn delete(&self, name: &str) -> Result<bool, SuiteError> {
        validate_name(name)?;
        match tokio::fs::remove_dir_all(self.root.join(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_err(name, e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, SuiteError> {
        let mut rd = match tokio::fs::read_dir(&self.root).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err("<root>", e)),
        };
        let mut names = Vec::new();
        while let Some(entry) = rd.next_entry().await.map_err(|e| storage_err("<root>", e))? {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            let file_name = entry.file_name();
            if let (true, Some(name)) = (is_dir, file_name.to_str()) {
                if validate_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(body: &[u8]) -> CachedResponse {
        let mut r = CachedResponse::ok("https://a.example/x.css", ResponseType::Cors, body.to_vec());
        r.headers.push(("content-type".into(), "text/css".into()));
        r
    }

    #[tokio::test]
    async fn round_trips_entries_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path());
        let p = storage.open("silentsuite-v1").await.unwrap();
        p.put("https://a.example/x.css", &resp(b"body{}")).await.unwrap();

        let reopened = DiskCacheStorage::new(dir.path());
        let hit = reopened
            .lookup("https://a.example/x.css")
            .await
            .unwrap()
            .expect("entry should persist");
        assert_eq!(hit.body, b"body{}");
        assert_eq!(hit.response_type, ResponseType::Cors);
        assert_eq!(hit.header("Content-Type"), Some("text/css"));
    }

    #[tokio::test]
    async fn keys_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path().join("cache"));
        assert!(storage.keys().await.unwrap().is_empty());

        storage.open("b-v2").await.unwrap();
        let a = storage.open("a-v1").await.unwrap();
        a.put("k1", &resp(b"1")).await.unwrap();
        a.put("k1", &resp(b"2")).await.unwrap();
        assert_eq!(a.keys().await.unwrap(), vec!["k1"]);
        assert_eq!(storage.keys().await.unwrap(), vec!["a-v1", "b-v2"]);

        assert!(storage.delete("a-v1").await.unwrap());
        assert!(!storage.has("a-v1").await.unwrap());
        assert!(!storage.delete("a-v1").await.unwrap());
    }

    #[tokio::test]
    async fn get_does_not_create_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path());
        assert!(storage.get("silentsuite-v1").await.unwrap().is_none());
        assert!(!dir.path().join("silentsuite-v1").exists());

        storage.open("silentsuite-v1").await.unwrap();
        assert!(storage.get("silentsuite-v1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn has_reports_unreadable_roots() {
        // Root is a plain file: stat fails with something other than NotFound.
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, b"x").unwrap();
        let storage = DiskCacheStorage::new(&root);

        let err = storage.has("silentsuite-v1").await.unwrap_err();
        assert!(matches!(err, SuiteError::Storage { ref partition, .. } if partition == "silentsuite-v1"));
    }

    #[tokio::test]
    async fn rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::new(dir.path());
        assert!(storage.open("../escape").await.is_err());
        assert!(storage.open("..").await.is_err());
    }
}
