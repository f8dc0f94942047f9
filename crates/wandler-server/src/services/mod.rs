// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the HTTP handlers to the wandler backend crates.

pub mod app_services;
pub mod fetch;

pub use app_services::AppServices;
pub use fetch::{RemoteDocument, RemoteFetcher};
