// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background sweeper — periodically removes stale artifacts and orphaned
// blobs from the registry's backing store.
//
// One long-lived Tokio task loops on a fixed interval. Each pass runs on the
// blocking pool so file I/O never stalls the async workers. The task exits
// when `stop` signals it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use wandler_core::error::{Result, WandlerError};
use wandler_core::types::{ArtifactId, SweeperStatus};

use crate::registry::ArtifactRegistry;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub ran_at: DateTime<Utc>,
    pub deleted: Vec<ArtifactId>,
    /// Storage keys of blobs that had no registry entry.
    pub orphans: Vec<String>,
}

/// Point-in-time view of the sweeper, as reported by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SweeperSnapshot {
    pub status: SweeperStatus,
    pub interval_secs: u64,
    pub max_age_secs: i64,
    pub last_run: Option<SweepReport>,
}

pub struct Sweeper {
    registry: Arc<ArtifactRegistry>,
    /// Time between passes.
    interval: Duration,
    /// Artifacts and orphaned blobs older than this are removed.
    max_age: chrono::Duration,
    status: SweeperStatus,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    last_run: Arc<Mutex<Option<SweepReport>>>,
}

impl Sweeper {
    /// Create a sweeper in `Stopped` state.
    pub fn new(registry: Arc<ArtifactRegistry>, interval: Duration, max_age: chrono::Duration) -> Self {
        Self {
            registry,
            interval,
            max_age,
            status: SweeperStatus::Stopped,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
            last_run: Arc::new(Mutex::new(None)),
        }
    }

    pub fn status(&self) -> SweeperStatus {
        self.status
    }

    pub fn last_run(&self) -> Option<SweepReport> {
        lock_report(&self.last_run).clone()
    }

    pub fn snapshot(&self) -> SweeperSnapshot {
        SweeperSnapshot {
            status: self.status,
            interval_secs: self.interval.as_secs(),
            max_age_secs: self.max_age.num_seconds(),
            last_run: self.last_run(),
        }
    }

    /// Spawn the sweep loop. The first pass runs immediately.
    ///
    /// Starting an already running sweeper is a no-op. Must be called from
    /// within a Tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.status == SweeperStatus::Running {
            debug!("sweeper already running");
            return Ok(());
        }
        if self.interval.is_zero() {
            return Err(WandlerError::Validation(
                "sweep interval must be greater than zero".into(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| WandlerError::Internal(format!("no async runtime: {e}")))?;

        let registry = Arc::clone(&self.registry);
        let shutdown = Arc::clone(&self.shutdown_signal);
        let last_run = Arc::clone(&self.last_run);
        let interval = self.interval;
        let max_age = self.max_age;

        let handle = runtime.spawn(async move {
            Self::sweep_loop(registry, shutdown, last_run, interval, max_age).await;
        });

        self.task_handle = Some(handle);
        self.status = SweeperStatus::Running;
        info!(
            interval_secs = interval.as_secs(),
            max_age_secs = max_age.num_seconds(),
            "artifact sweeper started"
        );
        Ok(())
    }

    /// Signal the loop to exit and wait for it. A pass already in progress
    /// finishes first.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != SweeperStatus::Running {
            return Ok(());
        }

        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| WandlerError::Internal(format!("sweeper task join: {e}")))?;
        }

        self.status = SweeperStatus::Stopped;
        info!("artifact sweeper stopped");
        Ok(())
    }

    /// Run one pass now, outside the schedule.
    pub async fn run_once(&self) -> Result<SweepReport> {
        let registry = Arc::clone(&self.registry);
        let max_age = self.max_age;
        let report = tokio::task::spawn_blocking(move || sweep_pass(&registry, max_age))
            .await
            .map_err(|e| WandlerError::Internal(format!("sweep task join: {e}")))?;
        *lock_report(&self.last_run) = Some(report.clone());
        Ok(report)
    }

    async fn sweep_loop(
        registry: Arc<ArtifactRegistry>,
        shutdown: Arc<Notify>,
        last_run: Arc<Mutex<Option<SweepReport>>>,
        interval: Duration,
        max_age: chrono::Duration,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("sweep loop received shutdown signal");
                    break;
                }

                _ = ticker.tick() => {
                    let registry = Arc::clone(&registry);
                    match tokio::task::spawn_blocking(move || sweep_pass(&registry, max_age)).await {
                        Ok(report) => *lock_report(&last_run) = Some(report),
                        Err(e) => warn!(error = %e, "sweep pass aborted"),
                    }
                }
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

fn sweep_pass(registry: &ArtifactRegistry, max_age: chrono::Duration) -> SweepReport {
    let deleted = registry.sweep(max_age);
    let orphans = registry.reclaim_orphans(max_age).unwrap_or_else(|err| {
        warn!(error = %err, "orphan reclamation failed");
        Vec::new()
    });
    debug!(
        deleted = deleted.len(),
        orphans = orphans.len(),
        "sweep pass complete"
    );
    SweepReport {
        ran_at: registry.clock().now(),
        deleted,
        orphans,
    }
}

fn lock_report(slot: &Mutex<Option<SweepReport>>) -> MutexGuard<'_, Option<SweepReport>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
