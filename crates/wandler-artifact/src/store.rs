// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blob stores — where artifact bytes live, keyed by an opaque storage key.
//
// All methods are synchronous. In an async context, wrap calls in
// `tokio::task::spawn_blocking`.

use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};
use wandler_core::error::{Result, WandlerError};

use crate::clock::{Clock, SystemClock};

/// A stored blob as seen by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub key: String,
    pub modified: DateTime<Utc>,
}

pub trait BlobStore: Send + Sync + std::fmt::Debug {
    fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Fails with `NotFound` if nothing is stored under `key`.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Returns whether a blob was actually removed.
    fn remove(&self, key: &str) -> Result<bool>;

    fn list(&self) -> Result<Vec<BlobInfo>>;
}

/// Keys become file names, so only a conservative alphabet is allowed.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(WandlerError::Storage(format!("invalid storage key '{key}'")))
    }
}

// ---------------------------------------------------------------------------
// Filesystem
// ---------------------------------------------------------------------------

/// One file per blob in a single directory.
///
/// Writes go to a hidden temporary file that is renamed into place, so a
/// reader never sees a partial blob.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open (or create) the store at `root`.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|err| {
            WandlerError::Storage(format!("cannot create {}: {err}", root.display()))
        })?;
        info!("artifact directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let partial = self.root.join(format!(".{key}.partial"));

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&partial)?;
            file.write_all(data)?;
            file.sync_all()?;
            fs::rename(&partial, &path)
        };
        write().map_err(|err| {
            let _ = fs::remove_file(&partial);
            WandlerError::Storage(format!("cannot write {key}: {err}"))
        })?;
        debug!(key, bytes = data.len(), "blob written");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => WandlerError::NotFound(key.to_owned()),
            _ => WandlerError::Storage(format!("cannot read {key}: {err}")),
        })
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "blob removed");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(WandlerError::Storage(format!("cannot remove {key}: {err}"))),
        }
    }

    fn list(&self) -> Result<Vec<BlobInfo>> {
        let entries = fs::read_dir(&self.root).map_err(|err| {
            WandlerError::Storage(format!("cannot list {}: {err}", self.root.display()))
        })?;

        let mut blobs = Vec::new();
        for entry in entries.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Some(key) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if !metadata.is_file() || validate_key(&key).is_err() {
                continue;
            }
            let modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            blobs.push(BlobInfo { key, modified });
        }
        Ok(blobs)
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StoredBlob {
    data: Vec<u8>,
    stored_at: DateTime<Utc>,
}

/// Process-local store. Contents vanish with the process.
#[derive(Debug)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, StoredBlob>>,
    clock: Arc<dyn Clock>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Timestamps blobs with `clock` instead of the wall clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredBlob>> {
        self.blobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        validate_key(key)?;
        let blob = StoredBlob {
            data: data.to_vec(),
            stored_at: self.clock.now(),
        };
        self.lock().insert(key.to_owned(), blob);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(key)
            .map(|blob| blob.data.clone())
            .ok_or_else(|| WandlerError::NotFound(key.to_owned()))
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.lock().remove(key).is_some())
    }

    fn list(&self) -> Result<Vec<BlobInfo>> {
        Ok(self
            .lock()
            .iter()
            .map(|(key, blob)| BlobInfo {
                key: key.clone(),
                modified: blob.stored_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn BlobStore) {
        store.put("a.pdf", b"first").unwrap();
        store.put("b.jpg", b"second").unwrap();
        assert_eq!(store.get("a.pdf").unwrap(), b"first");

        let mut keys: Vec<String> = store.list().unwrap().into_iter().map(|b| b.key).collect();
        keys.sort();
        assert_eq!(keys, ["a.pdf", "b.jpg"]);

        assert!(store.remove("a.pdf").unwrap());
        assert!(!store.remove("a.pdf").unwrap());
        assert!(matches!(store.get("a.pdf"), Err(WandlerError::NotFound(_))));
    }

    #[test]
    fn filesystem_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path().join("artifacts")).unwrap();
        exercise(&store);
        // No temporary files are left behind.
        let leftovers = fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryBlobStore::new();
        exercise(&store);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn keys_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        for key in ["../etc/passwd", "", ".hidden", "a/b"] {
            assert!(matches!(store.put(key, b"x"), Err(WandlerError::Storage(_))), "{key}");
        }
    }

    #[test]
    fn listing_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join(".partial-junk"), b"x").unwrap();
        store.put("kept.pdf", b"x").unwrap();
        let keys: Vec<String> = store.list().unwrap().into_iter().map(|b| b.key).collect();
        assert_eq!(keys, ["kept.pdf"]);
    }
}
