// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wandler HTTP service — conversion, protection and artifact endpoints.

pub mod error;
pub mod routes;
pub mod services;
pub mod upload;

pub use routes::router;
pub use services::AppServices;
