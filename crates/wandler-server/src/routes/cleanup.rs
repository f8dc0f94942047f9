// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sweeper control endpoints.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::error::ApiResult;
use crate::services::AppServices;

/// GET /cleanup/status
pub async fn status(State(services): State<AppServices>) -> Json<Value> {
    let snapshot = services.sweeper_snapshot().await;
    Json(json!({ "success": true, "sweeper": snapshot }))
}

/// POST /cleanup/start
pub async fn start(State(services): State<AppServices>) -> ApiResult<Json<Value>> {
    let snapshot = services.start_sweeper().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Cleanup service started",
        "sweeper": snapshot,
    })))
}

/// POST /cleanup/stop
pub async fn stop(State(services): State<AppServices>) -> ApiResult<Json<Value>> {
    let snapshot = services.stop_sweeper().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Cleanup service stopped",
        "sweeper": snapshot,
    })))
}

/// POST /cleanup/run
pub async fn run(State(services): State<AppServices>) -> ApiResult<Json<Value>> {
    let report = services.sweep_now().await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Removed {} expired artifact(s)", report.deleted.len()),
        "deleted_count": report.deleted.len(),
        "deleted": report.deleted,
        "orphans": report.orphans,
        "ran_at": report.ran_at,
    })))
}
