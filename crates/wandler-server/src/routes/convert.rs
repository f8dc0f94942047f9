// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion endpoints.
//
// - POST /pdf-to-powerpoint     upload `pdf_file`
// - POST /convert/pdf-to-pptx   JSON `{pdf_path, output_name?, include_images?}`
// - POST /powerpoint-to-pdf     upload `pptx_file`
// - POST /jpg-to-pdf            uploads `jpg_files` plus layout fields
// - POST /pdf-to-jpg            upload `pdf_file`, field `page_number`

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Map, json};
use tracing::info;
use wandler_core::error::WandlerError;
use wandler_core::types::{
    ArtifactMetadata, MarginPolicy, Operation, Orientation, PageSizePolicy,
};
use wandler_document::ImageLayout;

use super::{ArtifactBatch, ArtifactEnvelope};
use crate::error::ApiResult;
use crate::services::AppServices;
use crate::upload::{UploadForm, UploadKind};

/// POST /pdf-to-powerpoint
pub async fn pdf_to_powerpoint(
    State(services): State<AppServices>,
    multipart: Multipart,
) -> ApiResult<Json<ArtifactEnvelope>> {
    let mut form = UploadForm::read(multipart, services.config().max_upload_bytes).await?;
    let upload = form.file("pdf_file", UploadKind::Pdf)?;

    let converter = services.converter().clone();
    let name = upload.filename.clone();
    let output = services
        .run_blocking(move || converter.pdf_to_presentation(&upload.bytes, &upload.filename))
        .await?;

    let metadata = ArtifactMetadata::new(Operation::PdfToPresentation)
        .with_source_name(name)
        .with_page_count(output.page_count)
        .with_degraded_pages(output.degraded_pages.clone());
    let slides = output.page_count;
    let artifact = services.store_output(output, metadata).await?;

    Ok(Json(
        ArtifactEnvelope::new(&services, &artifact, "PDF successfully converted to PowerPoint")
            .detail("conversion_type", "pdf_to_powerpoint")
            .detail("slide_count", slides),
    ))
}

#[derive(Debug, Deserialize)]
pub struct RemotePdfRequest {
    pub pdf_path: String,
    #[serde(default)]
    pub output_name: Option<String>,
    #[serde(default = "default_include_images")]
    pub include_images: bool,
}

fn default_include_images() -> bool {
    true
}

/// POST /convert/pdf-to-pptx
///
/// Downloads the PDF at `pdf_path` and converts it at caption quality with
/// the document name on the first slide. `include_images` is recorded but
/// has no effect because whole pages are rendered.
pub async fn remote_pdf_to_pptx(
    State(services): State<AppServices>,
    payload: Result<Json<RemotePdfRequest>, JsonRejection>,
) -> ApiResult<Json<ArtifactEnvelope>> {
    let Json(request) = payload
        .map_err(|e| WandlerError::Validation(format!("invalid request body: {}", e.body_text())))?;

    let source = services.fetcher().fetch_pdf(&request.pdf_path).await?;

    let converter = services.converter().clone();
    let output_name = request.output_name.clone();
    let name = source.name.clone();
    let output = services
        .run_blocking(move || {
            converter.pdf_to_presentation_captioned(&source.bytes, &source.name, output_name.as_deref())
        })
        .await?;

    let metadata = ArtifactMetadata::new(Operation::PdfToPresentation)
        .with_source_name(name)
        .with_page_count(output.page_count)
        .with_degraded_pages(output.degraded_pages.clone())
        .with_option("source_url", request.pdf_path.clone())
        .with_option("include_images", request.include_images);
    let slides = output.page_count;
    let artifact = services.store_output(output, metadata).await?;

    Ok(Json(
        ArtifactEnvelope::new(&services, &artifact, "PDF successfully converted to PowerPoint")
            .detail("conversion_type", "pdf_to_powerpoint")
            .detail("slide_count", slides)
            .detail("include_images", request.include_images),
    ))
}

/// POST /powerpoint-to-pdf
pub async fn powerpoint_to_pdf(
    State(services): State<AppServices>,
    multipart: Multipart,
) -> ApiResult<Json<ArtifactEnvelope>> {
    let mut form = UploadForm::read(multipart, services.config().max_upload_bytes).await?;
    let upload = form.file("pptx_file", UploadKind::Presentation)?;

    let converter = services.converter().clone();
    let name = upload.filename.clone();
    let output = services
        .run_blocking(move || converter.presentation_to_pdf(&upload.bytes, &upload.filename))
        .await?;

    let metadata = ArtifactMetadata::new(Operation::PresentationToPdf)
        .with_source_name(name)
        .with_page_count(output.page_count)
        .with_degraded_pages(output.degraded_pages.clone());
    let pages = output.page_count;
    let degraded = output.degraded_pages.clone();
    let artifact = services.store_output(output, metadata).await?;

    Ok(Json(
        ArtifactEnvelope::new(&services, &artifact, "PowerPoint successfully converted to PDF")
            .detail("conversion_type", "powerpoint_to_pdf")
            .detail("page_count", pages)
            .detail("degraded_pages", degraded),
    ))
}

/// POST /jpg-to-pdf
///
/// One artifact when the images are merged, otherwise one per image.
pub async fn jpg_to_pdf(
    State(services): State<AppServices>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let mut form = UploadForm::read(multipart, services.config().max_upload_bytes).await?;
    let uploads = form.files("jpg_files", UploadKind::Jpeg)?;
    let layout = ImageLayout {
        orientation: form.parse_or("page_orientation", Orientation::Portrait)?,
        page_size: form.parse_or("page_size", PageSizePolicy::A4)?,
        margin: form.parse_or("margin", MarginPolicy::None)?,
        merge_all: form.flag_or("merge_all", true)?,
    };

    let image_count = uploads.len();
    let options = json!({
        "page_orientation": layout.orientation,
        "page_size": layout.page_size,
        "margin": layout.margin,
        "merge_all": layout.merge_all,
        "image_count": image_count,
    });

    let files: Vec<(String, Vec<u8>)> = uploads
        .into_iter()
        .map(|upload| (upload.filename, upload.bytes))
        .collect();
    let names: Vec<String> = files.iter().map(|(name, _)| name.clone()).collect();

    let converter = services.converter().clone();
    let outputs = services
        .run_blocking(move || converter.images_to_pdf(&files, layout))
        .await?;
    let merged = outputs.len() == 1 && image_count > 1;

    let mut pending = Vec::with_capacity(outputs.len());
    for (index, output) in outputs.into_iter().enumerate() {
        let mut metadata = ArtifactMetadata::new(Operation::ImagesToPdf)
            .with_image_count(if merged { image_count } else { 1 })
            .with_page_count(output.page_count)
            .with_degraded_pages(output.degraded_pages.clone())
            .with_option("page_orientation", options["page_orientation"].clone())
            .with_option("page_size", options["page_size"].clone())
            .with_option("margin", options["margin"].clone())
            .with_option("merge_all", layout.merge_all);
        if !merged {
            if let Some(name) = names.get(index) {
                metadata = metadata.with_source_name(name.clone());
            }
        }
        pending.push((output, metadata));
    }

    // All or nothing: a batch the client never hears about must not linger.
    let artifacts = services.store_outputs(pending).await?;
    let mut envelopes: Vec<ArtifactEnvelope> = artifacts
        .iter()
        .map(|artifact| ArtifactEnvelope::new(&services, artifact, "Image converted to PDF"))
        .collect();

    let message = format!("Successfully converted {image_count} JPG image(s) to PDF");
    info!(images = image_count, artifacts = envelopes.len(), "images converted");

    if envelopes.len() == 1 {
        let mut envelope = envelopes.remove(0);
        envelope.message = message;
        let envelope = envelope
            .detail("conversion_type", "jpg_to_pdf")
            .detail("options", options);
        return Ok(Json(envelope).into_response());
    }

    let mut details = Map::new();
    details.insert("conversion_type".into(), "jpg_to_pdf".into());
    details.insert("options".into(), options);
    Ok(Json(ArtifactBatch {
        success: true,
        message,
        count: envelopes.len(),
        files: envelopes,
        details,
    })
    .into_response())
}

/// POST /pdf-to-jpg
pub async fn pdf_to_jpg(
    State(services): State<AppServices>,
    multipart: Multipart,
) -> ApiResult<Json<ArtifactEnvelope>> {
    let mut form = UploadForm::read(multipart, services.config().max_upload_bytes).await?;
    let upload = form.file("pdf_file", UploadKind::Pdf)?;
    let page_number = form.number_or("page_number", 1)?;

    let converter = services.converter().clone();
    let name = upload.filename.clone();
    let output = services
        .run_blocking(move || converter.pdf_to_image(&upload.bytes, &upload.filename, page_number))
        .await?;

    let metadata = ArtifactMetadata::new(Operation::PdfToImage)
        .with_source_name(name)
        .with_page_number(page_number);
    let artifact = services.store_output(output, metadata).await?;

    Ok(Json(
        ArtifactEnvelope::new(
            &services,
            &artifact,
            format!("Page {page_number} successfully converted to JPG"),
        )
        .detail("conversion_type", "pdf_to_jpg")
        .detail("page_number", page_number),
    ))
}
