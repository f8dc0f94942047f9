// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact registry — the id → artifact map shared by every request handler
// and the background sweeper.
//
// The map sits behind a single mutex so create/get/delete/sweep are
// linearizable. Blob I/O happens outside the lock. An entry is removed from
// the map before its blob is freed, and only the caller that removed the
// entry frees the blob, so a blob is deleted at most once.
//
// All methods are synchronous. In an async context, wrap calls in
// `tokio::task::spawn_blocking`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Duration;
use tracing::{debug, info, instrument, warn};
use wandler_core::config::{AppConfig, StorageBackend};
use wandler_core::error::{Result, WandlerError};
use wandler_core::types::{Artifact, ArtifactId, ArtifactKind, ArtifactMetadata};
use wandler_security::{hash_bytes, verify_hash};

use crate::clock::{Clock, SystemClock};
use crate::store::{BlobStore, FsBlobStore, MemoryBlobStore};

pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug)]
pub struct ArtifactRegistry {
    entries: Mutex<HashMap<ArtifactId, Artifact>>,
    store: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ArtifactRegistry {
    pub fn new(store: Arc<dyn BlobStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            store,
            clock,
            ttl,
        }
    }

    /// Build the registry and backing store described by the configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store: Arc<dyn BlobStore> = match config.storage_backend {
            StorageBackend::Filesystem => Arc::new(FsBlobStore::open(&config.storage_dir)?),
            StorageBackend::Memory => Arc::new(MemoryBlobStore::with_clock(Arc::clone(&clock))),
        };
        let ttl = Duration::from_std(config.artifact_ttl())
            .map_err(|err| WandlerError::Validation(format!("artifact TTL out of range: {err}")))?;
        Ok(Self::new(store, clock, ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Number of registered artifacts, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ArtifactId, Artifact>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -- Lifecycle -----------------------------------------------------------

    /// Persist `bytes` and register them under a fresh identifier.
    #[instrument(skip_all, fields(filename = %filename, kind = ?kind, bytes = bytes.len()))]
    pub fn create(
        &self,
        bytes: &[u8],
        filename: &str,
        kind: ArtifactKind,
        metadata: ArtifactMetadata,
    ) -> Result<Artifact> {
        let id = ArtifactId::new();
        let storage_key = format!("{id}.{}", kind.extension());
        self.store.put(&storage_key, bytes)?;

        let created_at = self.clock.now();
        let artifact = Artifact {
            id,
            filename: filename.to_owned(),
            storage_key,
            size_bytes: bytes.len() as u64,
            sha256: hash_bytes(bytes),
            kind,
            created_at,
            expires_at: created_at + self.ttl,
            metadata,
        };
        self.lock().insert(id, artifact.clone());

        info!(artifact_id = %id, "artifact created");
        Ok(artifact)
    }

    /// Look up an artifact. One found past its expiration is deleted on the
    /// spot and reported as `Gone`.
    pub fn get(&self, id: &ArtifactId) -> Result<Artifact> {
        let now = self.clock.now();
        let expired = {
            let mut entries = self.lock();
            match entries.get(id) {
                None => return Err(WandlerError::NotFound(id.to_string())),
                Some(artifact) if !artifact.is_expired_at(now) => return Ok(artifact.clone()),
                Some(_) => entries.remove(id),
            }
        };

        if let Some(artifact) = expired {
            self.free_blob(&artifact);
            info!(artifact_id = %id, "expired artifact removed on access");
        }
        Err(WandlerError::Gone(id.to_string()))
    }

    /// Look up an artifact and load its bytes, checking them against the
    /// fingerprint recorded at creation.
    #[instrument(skip(self))]
    pub fn read(&self, id: &ArtifactId) -> Result<(Artifact, Vec<u8>)> {
        let artifact = self.get(id)?;
        let bytes = self.store.get(&artifact.storage_key).map_err(|err| match err {
            // Deleted between the lookup and the read.
            WandlerError::NotFound(_) => WandlerError::NotFound(id.to_string()),
            other => other,
        })?;
        verify_hash(&bytes, &artifact.sha256)?;
        debug!(bytes = bytes.len(), "artifact read");
        Ok((artifact, bytes))
    }

    /// Remove an artifact and its bytes. A second delete of the same id
    /// reports `NotFound`.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &ArtifactId) -> Result<Artifact> {
        let removed = self.lock().remove(id);
        let artifact = removed.ok_or_else(|| WandlerError::NotFound(id.to_string()))?;
        self.free_blob(&artifact);
        info!(artifact_id = %id, "artifact deleted");
        Ok(artifact)
    }

    /// Active artifacts, oldest first.
    pub fn list(&self) -> Vec<Artifact> {
        let now = self.clock.now();
        let mut active: Vec<Artifact> = self
            .lock()
            .values()
            .filter(|artifact| !artifact.is_expired_at(now))
            .cloned()
            .collect();
        active.sort_by_key(|artifact| artifact.created_at);
        active
    }

    // -- Reclamation ---------------------------------------------------------

    /// Remove every artifact older than `max_age` or past its expiration.
    /// Returns the removed identifiers, oldest first.
    #[instrument(skip(self), fields(max_age_secs = max_age.num_seconds()))]
    pub fn sweep(&self, max_age: Duration) -> Vec<ArtifactId> {
        let now = self.clock.now();
        let mut removed: Vec<Artifact> = {
            let mut entries = self.lock();
            let stale: Vec<ArtifactId> = entries
                .values()
                .filter(|artifact| artifact.age_at(now) > max_age || artifact.is_expired_at(now))
                .map(|artifact| artifact.id)
                .collect();
            stale.iter().filter_map(|id| entries.remove(id)).collect()
        };
        removed.sort_by_key(|artifact| artifact.created_at);

        for artifact in &removed {
            self.free_blob(artifact);
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "swept stale artifacts");
        }
        removed.into_iter().map(|artifact| artifact.id).collect()
    }

    /// Delete blobs that no registry entry refers to and that are older than
    /// `max_age`. Returns the removed storage keys.
    #[instrument(skip(self), fields(max_age_secs = max_age.num_seconds()))]
    pub fn reclaim_orphans(&self, max_age: Duration) -> Result<Vec<String>> {
        let now = self.clock.now();
        let known: HashSet<String> = self
            .lock()
            .values()
            .map(|artifact| artifact.storage_key.clone())
            .collect();

        let mut reclaimed = Vec::new();
        for blob in self.store.list()? {
            if known.contains(&blob.key) || now - blob.modified <= max_age {
                continue;
            }
            // A blob written by `create` is registered right after the write,
            // so it is never older than `max_age` while unregistered.
            if self.store.remove(&blob.key)? {
                reclaimed.push(blob.key);
            }
        }
        reclaimed.sort();
        if !reclaimed.is_empty() {
            info!(count = reclaimed.len(), "reclaimed orphaned blobs");
        }
        Ok(reclaimed)
    }

    fn free_blob(&self, artifact: &Artifact) {
        match self.store.remove(&artifact.storage_key) {
            Ok(true) => {}
            Ok(false) => warn!(key = %artifact.storage_key, "blob already missing"),
            Err(err) => warn!(key = %artifact.storage_key, "failed to remove blob: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use chrono::Utc;
    use wandler_core::types::Operation;

    use super::*;
    use crate::clock::ManualClock;

    struct Fixture {
        registry: Arc<ArtifactRegistry>,
        store: Arc<MemoryBlobStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryBlobStore::with_clock(clock.clone()));
        let registry = Arc::new(ArtifactRegistry::new(
            store.clone(),
            clock.clone(),
            Duration::hours(DEFAULT_TTL_HOURS),
        ));
        Fixture {
            registry,
            store,
            clock,
        }
    }

    fn create(registry: &ArtifactRegistry, name: &str) -> Artifact {
        registry
            .create(
                b"%PDF-1.7 body",
                name,
                ArtifactKind::Pdf,
                ArtifactMetadata::new(Operation::Compress),
            )
            .unwrap()
    }

    #[test]
    fn create_then_read_returns_the_same_bytes() {
        let f = fixture();
        let artifact = create(&f.registry, "report.pdf");
        assert_eq!(artifact.size_bytes, 13);
        assert_eq!(artifact.expires_at - artifact.created_at, Duration::hours(24));
        assert!(artifact.storage_key.ends_with(".pdf"));

        let (found, bytes) = f.registry.read(&artifact.id).unwrap();
        assert_eq!(found, artifact);
        assert_eq!(bytes, b"%PDF-1.7 body");
    }

    #[test]
    fn expiry_is_strictly_after_the_ttl() {
        let f = fixture();
        let artifact = create(&f.registry, "a.pdf");

        f.clock.advance(Duration::hours(24));
        assert!(f.registry.get(&artifact.id).is_ok(), "exactly at expiry is still live");

        f.clock.advance(Duration::seconds(1));
        assert!(matches!(f.registry.get(&artifact.id), Err(WandlerError::Gone(_))));
        // The entry and its bytes went with it.
        assert!(f.store.is_empty());
        assert!(matches!(f.registry.get(&artifact.id), Err(WandlerError::NotFound(_))));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let f = fixture();
        assert!(matches!(
            f.registry.get(&ArtifactId::new()),
            Err(WandlerError::NotFound(_))
        ));
        assert!(matches!(
            f.registry.delete(&ArtifactId::new()),
            Err(WandlerError::NotFound(_))
        ));
    }

    #[test]
    fn tampered_bytes_fail_the_integrity_check() {
        let f = fixture();
        let artifact = create(&f.registry, "a.pdf");
        f.store.put(&artifact.storage_key, b"something else").unwrap();
        assert!(matches!(
            f.registry.read(&artifact.id),
            Err(WandlerError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn racing_deletes_free_storage_once() {
        let f = fixture();
        let artifact = create(&f.registry, "a.pdf");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&f.registry);
                let id = artifact.id;
                thread::spawn(move || registry.delete(&id).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert!(f.store.is_empty());
        assert!(f.registry.is_empty());
    }

    #[test]
    fn sweep_removes_only_stale_entries() {
        let f = fixture();
        let old = create(&f.registry, "old.pdf");
        f.clock.advance(Duration::minutes(90));
        let fresh = create(&f.registry, "fresh.pdf");

        let swept = f.registry.sweep(Duration::hours(1));
        assert_eq!(swept, vec![old.id]);
        assert!(f.registry.get(&fresh.id).is_ok());
        assert_eq!(f.store.len(), 1);

        // Nothing left to sweep.
        assert!(f.registry.sweep(Duration::hours(1)).is_empty());
    }

    #[test]
    fn list_skips_expired_and_orders_by_creation() {
        let f = fixture();
        create(&f.registry, "first.pdf");
        f.clock.advance(Duration::hours(23));
        let second = create(&f.registry, "second.pdf");
        f.clock.advance(Duration::hours(2));

        let listed: Vec<ArtifactId> = f.registry.list().iter().map(|a| a.id).collect();
        assert_eq!(listed, vec![second.id]);
        // Listing is read-only; the expired entry is still registered.
        assert_eq!(f.registry.len(), 2);
    }

    #[test]
    fn orphans_are_reclaimed_after_max_age() {
        let f = fixture();
        let kept = create(&f.registry, "kept.pdf");
        f.store.put("left-behind.pdf", b"stale").unwrap();

        assert!(f.registry.reclaim_orphans(Duration::hours(1)).unwrap().is_empty());

        f.clock.advance(Duration::hours(2));
        let reclaimed = f.registry.reclaim_orphans(Duration::hours(1)).unwrap();
        assert_eq!(reclaimed, vec!["left-behind.pdf".to_string()]);
        assert!(f.registry.read(&kept.id).is_ok());
    }

    #[test]
    fn filesystem_backend_survives_a_full_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsBlobStore::open(dir.path()).unwrap());
        let registry =
            ArtifactRegistry::new(store, Arc::new(SystemClock), Duration::hours(DEFAULT_TTL_HOURS));

        let artifact = create(&registry, "disk.pdf");
        assert!(dir.path().join(&artifact.storage_key).exists());
        registry.delete(&artifact.id).unwrap();
        assert!(!dir.path().join(&artifact.storage_key).exists());
    }
}
