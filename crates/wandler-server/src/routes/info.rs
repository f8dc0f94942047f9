// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service description and health check.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::services::AppServices;

const SERVICE_NAME: &str = "Wandler document conversion API";

/// GET /
pub async fn service_info(State(services): State<AppServices>) -> Json<Value> {
    Json(json!({
        "message": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "rasterizer": services.converter().rasterizer_name(),
        "artifact_ttl_hours": services.registry().ttl().num_hours(),
        "endpoints": {
            "pdf_to_powerpoint": "POST /pdf-to-powerpoint",
            "pdf_url_to_powerpoint": "POST /convert/pdf-to-pptx",
            "powerpoint_to_pdf": "POST /powerpoint-to-pdf",
            "jpg_to_pdf": "POST /jpg-to-pdf",
            "pdf_to_jpg": "POST /pdf-to-jpg",
            "unlock_pdf": "POST /unlock-pdf",
            "unlock_with_password": "POST /unlock-with-password",
            "lock_pdf": "POST /lock-pdf",
            "compress_pdf": "POST /compress-pdf",
            "list_artifacts": "GET /artifacts",
            "download": "GET /artifacts/{file_id}",
            "delete": "DELETE /artifacts/{file_id}",
            "cleanup_status": "GET /cleanup/status",
            "cleanup_start": "POST /cleanup/start",
            "cleanup_stop": "POST /cleanup/stop",
            "cleanup_run": "POST /cleanup/run",
        },
    }))
}

/// GET /health
pub async fn health(State(services): State<AppServices>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "artifacts": services.registry().len(),
    }))
}
