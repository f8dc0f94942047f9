// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wandler-artifact — Ephemeral storage for conversion results.
//
// Holds the artifact registry (id → artifact, with lazy expiry on access),
// the pluggable blob stores behind it, the clock used for expiry decisions,
// and the background sweeper that reclaims stale artifacts and orphaned
// blobs.

pub mod clock;
pub mod registry;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::ArtifactRegistry;
pub use store::{BlobInfo, BlobStore, FsBlobStore, MemoryBlobStore};
pub use sweeper::{SweepReport, Sweeper, SweeperSnapshot};
