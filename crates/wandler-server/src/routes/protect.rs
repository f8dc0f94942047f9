// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Password protection and compression endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use serde_json::json;
use tracing::info;
use wandler_core::error::WandlerError;
use wandler_core::types::{
    ArtifactId, ArtifactKind, ArtifactMetadata, CompressionLevel, Operation, UnlockMethod,
};
use wandler_document::SecuredOutput;

use super::ArtifactEnvelope;
use crate::error::ApiResult;
use crate::services::AppServices;
use crate::upload::{UploadForm, UploadKind};

/// Prefix of an upload kept for a later password attempt.
const PENDING_PREFIX: &str = "original_";

/// POST /unlock-pdf
///
/// Tries to remove protection without a password. When that fails the
/// upload is kept and the response asks for the password, naming the
/// `file_id` to send to `/unlock-with-password`.
pub async fn unlock_pdf(
    State(services): State<AppServices>,
    multipart: Multipart,
) -> ApiResult<Json<ArtifactEnvelope>> {
    let mut form = UploadForm::read(multipart, services.config().max_upload_bytes).await?;
    let upload = form.file("pdf_file", UploadKind::Pdf)?;
    let data: Arc<[u8]> = upload.bytes.into();

    let security = services.security().clone();
    let attempt = Arc::clone(&data);
    match services
        .run_blocking(move || security.unlock_auto(&attempt))
        .await
    {
        Ok(output) => {
            let envelope = store_unlocked(&services, output, &upload.filename).await?;
            Ok(Json(envelope))
        }
        Err(WandlerError::UnlockFailed(reason)) => {
            let metadata = ArtifactMetadata::new(Operation::PendingUnlock)
                .with_source_name(upload.filename.clone())
                .with_unlock_method(UnlockMethod::FailedAutomatic);
            let artifact = services
                .store(
                    data.to_vec(),
                    format!("{PENDING_PREFIX}{}", upload.filename),
                    ArtifactKind::Pdf,
                    metadata,
                )
                .await?;
            info!(artifact_id = %artifact.id, "automatic unlock failed, upload kept");

            Ok(Json(
                ArtifactEnvelope::new(
                    &services,
                    &artifact,
                    "Automatic unlock failed - password required",
                )
                .failed()
                .detail("password_required", true)
                .detail("unlock_method", json!(UnlockMethod::FailedAutomatic))
                .detail("original_filename", upload.filename.as_str())
                .detail("reason", reason)
                .detail(
                    "next_step",
                    "Call /unlock-with-password with this file_id and the password",
                ),
            ))
        }
        Err(other) => Err(other.into()),
    }
}

/// POST /unlock-with-password
///
/// Takes `password` plus either `file_id` (from a failed `/unlock-pdf`) or a
/// fresh `pdf_file` upload.
pub async fn unlock_with_password(
    State(services): State<AppServices>,
    multipart: Multipart,
) -> ApiResult<Json<ArtifactEnvelope>> {
    let mut form = UploadForm::read(multipart, services.config().max_upload_bytes).await?;
    let password = required_password(&form)?;

    let file_id = form.text("file_id").map(str::to_owned);
    let (name, data) = match file_id {
        Some(raw_id) => {
            let id = ArtifactId::parse(&raw_id)?;
            let (artifact, bytes) = services.read_artifact(id).await?;
            let name = artifact.metadata.source_name.clone().unwrap_or_else(|| {
                artifact
                    .filename
                    .strip_prefix(PENDING_PREFIX)
                    .unwrap_or(&artifact.filename)
                    .to_owned()
            });
            (name, bytes)
        }
        None => {
            let upload = form
                .optional_file("pdf_file", UploadKind::Pdf)?
                .ok_or_else(|| {
                    WandlerError::Validation("provide either file_id or pdf_file".into())
                })?;
            (upload.filename, upload.bytes)
        }
    };

    let security = services.security().clone();
    let output = services
        .run_blocking(move || security.unlock_with_password(&data, &password))
        .await?;
    let envelope = store_unlocked(&services, output, &name).await?;
    Ok(Json(envelope))
}

async fn store_unlocked(
    services: &AppServices,
    output: SecuredOutput,
    name: &str,
) -> ApiResult<ArtifactEnvelope> {
    let method = output.method.unwrap_or(UnlockMethod::NotEncrypted);
    let metadata = ArtifactMetadata::new(Operation::Unlock)
        .with_source_name(name)
        .with_page_count(output.page_count)
        .with_unlock_method(method);
    let artifact = services
        .store(
            output.bytes,
            format!("unlocked_{name}"),
            ArtifactKind::Pdf,
            metadata,
        )
        .await?;

    Ok(ArtifactEnvelope::new(
        services,
        &artifact,
        "PDF unlocked successfully - no password required to open",
    )
    .detail("unlock_method", json!(method))
    .detail("page_count", output.page_count))
}

/// POST /lock-pdf
pub async fn lock_pdf(
    State(services): State<AppServices>,
    multipart: Multipart,
) -> ApiResult<Json<ArtifactEnvelope>> {
    let mut form = UploadForm::read(multipart, services.config().max_upload_bytes).await?;
    let upload = form.file("pdf_file", UploadKind::Pdf)?;
    let password = required_password(&form)?;

    let security = services.security().clone();
    let bytes = upload.bytes;
    let output = services
        .run_blocking(move || security.lock(&bytes, &password))
        .await?;

    let metadata = ArtifactMetadata::new(Operation::Lock)
        .with_source_name(upload.filename.clone())
        .with_page_count(output.page_count);
    let pages = output.page_count;
    let artifact = services
        .store(
            output.bytes,
            format!("locked_{}", upload.filename),
            ArtifactKind::Pdf,
            metadata,
        )
        .await?;

    Ok(Json(
        ArtifactEnvelope::new(&services, &artifact, "PDF locked successfully")
            .detail("page_count", pages),
    ))
}

/// POST /compress-pdf
pub async fn compress_pdf(
    State(services): State<AppServices>,
    multipart: Multipart,
) -> ApiResult<Json<ArtifactEnvelope>> {
    let mut form = UploadForm::read(multipart, services.config().max_upload_bytes).await?;
    let upload = form.file("pdf_file", UploadKind::Pdf)?;
    let level = form.parse_or("compression_level", CompressionLevel::Medium)?;

    let bytes = upload.bytes;
    let outcome = services
        .run_blocking(move || wandler_document::compress_pdf(&bytes, level))
        .await?;

    let metadata = ArtifactMetadata::new(Operation::Compress)
        .with_source_name(upload.filename.clone())
        .with_compression_level(level)
        .with_option("original_size", outcome.original_size)
        .with_option("reduction_percent", outcome.reduction_percent);
    let original_size = outcome.original_size;
    let compressed_size = outcome.compressed_size;
    let reduction = outcome.reduction_percent;
    let artifact = services
        .store(
            outcome.bytes,
            format!("compressed_{}_{}", level.as_str(), upload.filename),
            ArtifactKind::Pdf,
            metadata,
        )
        .await?;

    Ok(Json(
        ArtifactEnvelope::new(
            &services,
            &artifact,
            format!("PDF compressed successfully with {} compression", level.as_str()),
        )
        .detail("compression_level", level.as_str())
        .detail("original_size", original_size)
        .detail("compressed_size", compressed_size)
        .detail("reduction_percent", reduction),
    ))
}

fn required_password(form: &UploadForm) -> Result<String, WandlerError> {
    form.secret("password")
        .map(str::to_owned)
        .ok_or_else(|| WandlerError::Validation("password is required".into()))
}
