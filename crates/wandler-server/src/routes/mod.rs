// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP routes and the JSON envelopes they answer with.

pub mod artifacts;
pub mod cleanup;
pub mod convert;
pub mod info;
pub mod protect;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wandler_core::types::{Artifact, ArtifactId, ArtifactKind};

use crate::services::AppServices;

/// Most files accepted in one form. Bounds the whole request body together
/// with the per-file cap.
const MAX_FORM_FILES: usize = 50;

/// Build the service router.
pub fn router(services: AppServices) -> Router {
    let body_limit = services
        .config()
        .max_upload_bytes
        .saturating_mul(MAX_FORM_FILES);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(info::service_info))
        .route("/health", get(info::health))
        // Conversions
        .route("/pdf-to-powerpoint", post(convert::pdf_to_powerpoint))
        .route("/convert/pdf-to-pptx", post(convert::remote_pdf_to_pptx))
        .route("/powerpoint-to-pdf", post(convert::powerpoint_to_pdf))
        .route("/jpg-to-pdf", post(convert::jpg_to_pdf))
        .route("/pdf-to-jpg", post(convert::pdf_to_jpg))
        // Protection
        .route("/unlock-pdf", post(protect::unlock_pdf))
        .route("/unlock-with-password", post(protect::unlock_with_password))
        .route("/lock-pdf", post(protect::lock_pdf))
        .route("/compress-pdf", post(protect::compress_pdf))
        // Artifacts
        .route("/artifacts", get(artifacts::list))
        .route(
            "/artifacts/:id",
            get(artifacts::download).delete(artifacts::remove),
        )
        .route(
            "/download-pdf/:id",
            get(artifacts::download).delete(artifacts::remove),
        )
        // Sweeper control
        .route("/cleanup/status", get(cleanup::status))
        .route("/cleanup/start", post(cleanup::start))
        .route("/cleanup/stop", post(cleanup::stop))
        .route("/cleanup/run", post(cleanup::run))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(services)
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Reference to a stored artifact, returned by every producing endpoint.
#[derive(Debug, Serialize)]
pub struct ArtifactEnvelope {
    pub success: bool,
    pub message: String,
    pub file_id: ArtifactId,
    pub filename: String,
    pub download_url: String,
    pub file_size: u64,
    pub kind: ArtifactKind,
    pub expires_at: DateTime<Utc>,
    /// Endpoint-specific extras, flattened into the top level.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ArtifactEnvelope {
    pub fn new(services: &AppServices, artifact: &Artifact, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            file_id: artifact.id,
            filename: artifact.filename.clone(),
            download_url: services.download_url(&artifact.id),
            file_size: artifact.size_bytes,
            kind: artifact.kind,
            expires_at: artifact.expires_at,
            details: Map::new(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_owned(), value.into());
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}

/// Several artifacts from one request.
#[derive(Debug, Serialize)]
pub struct ArtifactBatch {
    pub success: bool,
    pub message: String,
    pub count: usize,
    pub files: Vec<ArtifactEnvelope>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}
