// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact download, deletion, and listing.
//
// `/download-pdf/:id` is an alias of `/artifacts/:id` and shares these
// handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use wandler_core::types::{ArtifactId, ArtifactKind};

use crate::error::ApiResult;
use crate::services::AppServices;

/// GET /artifacts/:id
///
/// Streams the stored bytes. An expired artifact is purged and answered
/// with 410.
pub async fn download(
    State(services): State<AppServices>,
    Path(raw_id): Path<String>,
) -> ApiResult<Response> {
    let id = ArtifactId::parse(&raw_id)?;
    let (artifact, bytes) = services.read_artifact(id).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe(&artifact.filename)
    );
    Ok((
        [
            (header::CONTENT_TYPE, artifact.kind.mime_type().to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// DELETE /artifacts/:id
pub async fn remove(
    State(services): State<AppServices>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = ArtifactId::parse(&raw_id)?;
    let artifact = services.delete_artifact(id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} deleted successfully", artifact.filename),
        "file_id": artifact.id,
    })))
}

#[derive(Debug, Serialize)]
pub struct ArtifactSummary {
    pub file_id: ArtifactId,
    pub filename: String,
    pub file_size: u64,
    pub kind: ArtifactKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub download_url: String,
}

/// GET /artifacts
pub async fn list(State(services): State<AppServices>) -> Json<Value> {
    let artifacts: Vec<ArtifactSummary> = services
        .list_artifacts()
        .into_iter()
        .map(|artifact| ArtifactSummary {
            download_url: services.download_url(&artifact.id),
            file_id: artifact.id,
            filename: artifact.filename,
            file_size: artifact.size_bytes,
            kind: artifact.kind,
            created_at: artifact.created_at,
            expires_at: artifact.expires_at,
        })
        .collect();
    Json(json!({
        "success": true,
        "count": artifacts.len(),
        "artifacts": artifacts,
    }))
}

/// Quotes and control characters would break the header value.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}
