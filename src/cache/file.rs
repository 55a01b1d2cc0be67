// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::store::CacheStore;
use crate::error::CacheError;

const ENTRY_EXTENSION: &str = "json";
const PARTIAL_EXTENSION: &str = "partial";

/// Distinguishes the temp files of overlapping writes to one key
static WRITE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// On-disk envelope; the key is kept so entries stay inspectable
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    value: Value,
}

/// Cache store keeping one JSON file per key inside a directory
///
/// File names are the SHA-256 of the key, since keys are arbitrary URLs.
/// Writes go to a `.partial` sibling first and are renamed into place once
/// flushed to disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    partial_files_cleaned: usize,
}

impl FileStore {
    /// Open (and create if needed) a cache directory
    ///
    /// Leftover `.partial` files from interrupted writes are removed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::CreateDirectoryFailed {
                path: dir.clone(),
                source: e,
            })?;

        let mut partial_files_cleaned = 0;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| CacheError::ReadFailed {
                path: dir.clone(),
                source: e,
            })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::ReadFailed {
                path: dir.clone(),
                source: e,
            })?
        {
            let path = entry.path();
            let is_partial = path
                .extension()
                .is_some_and(|ext| ext == PARTIAL_EXTENSION);

            if is_partial && tokio::fs::remove_file(&path).await.is_ok() {
                partial_files_cleaned += 1;
            }
        }

        if partial_files_cleaned > 0 {
            info!(
                dir = %dir.display(),
                count = partial_files_cleaned,
                "Removed interrupted cache writes"
            );
        }

        Ok(Self {
            dir,
            partial_files_cleaned,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of `.partial` files removed when the store was opened
    pub fn partial_files_cleaned(&self) -> usize {
        self.partial_files_cleaned
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{digest:x}.{ENTRY_EXTENSION}"))
    }

    /// A temp file no other write, in this process or another, is using
    fn partial_path(&self, entry: &Path) -> PathBuf {
        let sequence = WRITE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        entry.with_extension(format!(
            "{ENTRY_EXTENSION}.{}-{sequence}.{PARTIAL_EXTENSION}",
            std::process::id()
        ))
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let path = self.entry_path(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::ReadFailed { path, source: e }),
        };

        let entry: StoredEntry =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::Decode {
                key: key.to_string(),
                source: e,
            })?;

        if entry.key != key {
            warn!(key, stored = %entry.key, "Cache file belongs to a different key");
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let partial_path = self.partial_path(&path);

        let entry = StoredEntry {
            key: key.to_string(),
            value,
        };
        let json = serde_json::to_vec(&entry).map_err(|e| CacheError::Encode {
            key: key.to_string(),
            source: e,
        })?;

        let mut file =
            File::create(&partial_path)
                .await
                .map_err(|e| CacheError::WriteFailed {
                    path: partial_path.clone(),
                    source: e,
                })?;

        file.write_all(&json)
            .await
            .map_err(|e| CacheError::WriteFailed {
                path: partial_path.clone(),
                source: e,
            })?;

        // Durable before the rename makes it visible
        file.sync_all()
            .await
            .map_err(|e| CacheError::WriteFailed {
                path: partial_path.clone(),
                source: e,
            })?;
        drop(file);

        tokio::fs::rename(&partial_path, &path)
            .await
            .map_err(|e| CacheError::WriteFailed {
                path: path.clone(),
                source: e,
            })?;

        debug!(key, path = %path.display(), "Cache entry written");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::DeleteFailed { path, source: e }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_nonexistent_dir() {
        let dir = tempdir().unwrap();
        let cache_dir = dir.path().join("cache");

        assert!(!cache_dir.exists());
        let store = FileStore::open(&cache_dir).await.unwrap();
        assert!(cache_dir.exists());
        assert_eq!(store.partial_files_cleaned(), 0);
    }

    #[tokio::test]
    async fn set_then_get_observes_value() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        store
            .set("https://example.com/feed.xml|feed", json!({"title": "Feed"}))
            .await
            .unwrap();

        let value = store.get("https://example.com/feed.xml|feed").await.unwrap();
        assert_eq!(value, Some(json!({"title": "Feed"})));
    }

    #[tokio::test]
    async fn values_survive_reopening() {
        let dir = tempdir().unwrap();

        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.set("|categories", json!([1, 2, 3])).await.unwrap();
        }

        let reopened = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(
            reopened.get("|categories").await.unwrap(),
            Some(json!([1, 2, 3]))
        );
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        assert!(store.get("|current").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_entry_and_tolerates_missing() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        store.set("|current", json!({"content": "x"})).await.unwrap();
        store.delete("|current").await.unwrap();
        store.delete("|current").await.unwrap();

        assert!(store.get("|current").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_decode_error() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        std::fs::write(store.entry_path("top|podcasts"), b"not json").unwrap();

        let result = store.get("top|podcasts").await;
        assert!(matches!(result, Err(CacheError::Decode { .. })));
    }

    #[tokio::test]
    async fn open_cleans_up_partial_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("abc.json.partial"), b"half").unwrap();
        std::fs::write(dir.path().join("def.json.partial"), b"half").unwrap();
        std::fs::write(dir.path().join("keep.json"), b"{}").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();

        assert_eq!(store.partial_files_cleaned(), 2);
        assert!(!dir.path().join("abc.json.partial").exists());
        assert!(dir.path().join("keep.json").exists());
    }

    #[tokio::test]
    async fn writes_leave_no_partial_files_behind() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();

        store.set("a", json!(1)).await.unwrap();
        store.set("b", json!(2)).await.unwrap();

        let partials = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "partial"))
            .count();
        assert_eq!(partials, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_writes_to_one_key_all_succeed() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(FileStore::open(dir.path()).await.unwrap());

        for round in 0..20 {
            let writers: Vec<_> = (0..8)
                .map(|n| {
                    let store = store.clone();
                    let padding = "x".repeat(if n % 2 == 0 { 10 } else { 5000 });
                    tokio::spawn(async move {
                        store
                            .set("ep1|position", json!({"round": round, "writer": n, "pad": padding}))
                            .await
                    })
                })
                .collect();

            for writer in writers {
                writer.await.unwrap().unwrap();
            }

            let value = store.get("ep1|position").await.unwrap().unwrap();
            assert_eq!(value["round"], round);
        }

        let partials = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "partial"))
            .count();
        assert_eq!(partials, 0);
    }

    #[test]
    fn partial_paths_are_unique_and_cleanable() {
        let store = FileStore {
            dir: PathBuf::from("/cache"),
            partial_files_cleaned: 0,
        };
        let entry = store.entry_path("ep1|position");

        let first = store.partial_path(&entry);
        let second = store.partial_path(&entry);

        assert_ne!(first, second);
        assert!(first.extension().is_some_and(|ext| ext == PARTIAL_EXTENSION));
        assert!(first.starts_with("/cache"));
    }
}
