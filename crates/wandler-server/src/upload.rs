// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multipart form intake and upload validation.
//
// Files are streamed chunk by chunk so an oversized upload is rejected as
// soon as it crosses the per-file cap, before the rest is buffered.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use axum::extract::Multipart;
use tracing::debug;
use wandler_core::error::{Result, WandlerError};

use crate::error::ApiResult;

/// What an upload field is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Presentation,
    Jpeg,
}

impl UploadKind {
    fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["pdf"],
            Self::Presentation => &["pptx"],
            Self::Jpeg => &["jpg", "jpeg"],
        }
    }

    fn content_types(&self) -> &'static [&'static str] {
        match self {
            Self::Pdf => &["application/pdf"],
            Self::Presentation => &[
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
                "application/octet-stream",
            ],
            Self::Jpeg => &["image/jpeg", "image/jpg", "application/octet-stream"],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Presentation => "PowerPoint (.pptx)",
            Self::Jpeg => "JPEG",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Check extension, declared content type and emptiness against `kind`.
    pub fn validate(&self, kind: UploadKind) -> Result<()> {
        let extension = Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !kind.extensions().contains(&extension.as_str()) {
            return Err(WandlerError::Validation(format!(
                "'{}' is not a {} file (expected extension: {})",
                self.filename,
                kind.label(),
                kind.extensions().join(", ")
            )));
        }

        let declared = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if !kind.content_types().contains(&declared.as_str()) {
            return Err(WandlerError::Validation(format!(
                "'{}' has content type '{declared}', expected one of: {}",
                self.filename,
                kind.content_types().join(", ")
            )));
        }

        if self.bytes.is_empty() {
            return Err(WandlerError::Validation(format!("'{}' is empty", self.filename)));
        }
        Ok(())
    }
}

/// A fully read multipart form: file parts plus plain text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Drain `multipart`, rejecting any file larger than `max_file_bytes`.
    pub async fn read(mut multipart: Multipart, max_file_bytes: usize) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();

            let Some(filename) = field.file_name().map(base_name) else {
                let value = field.text().await?;
                form.fields.insert(name, value);
                continue;
            };
            let content_type = field.content_type().map(str::to_owned);

            let mut bytes = Vec::new();
            while let Some(chunk) = field.chunk().await? {
                if bytes.len() + chunk.len() > max_file_bytes {
                    return Err(WandlerError::Validation(format!(
                        "'{filename}' exceeds the {} MB upload limit",
                        max_file_bytes / (1024 * 1024)
                    ))
                    .into());
                }
                bytes.extend_from_slice(&chunk);
            }

            debug!(field = %name, filename = %filename, bytes = bytes.len(), "upload received");
            form.files.push(UploadedFile {
                field: name,
                filename,
                content_type,
                bytes,
            });
        }
        Ok(form)
    }

    /// A non-blank text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// A non-empty field taken verbatim. Passwords may legitimately start or
    /// end with spaces.
    pub fn secret(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Parse a text field, falling back to `default` when it is absent.
    pub fn parse_or<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr<Err = WandlerError>,
    {
        self.text(name).map_or(Ok(default), |raw| raw.parse())
    }

    pub fn number_or(&self, name: &str, default: u32) -> Result<u32> {
        match self.text(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| {
                WandlerError::Validation(format!("{name} must be a positive whole number, got '{raw}'"))
            }),
        }
    }

    pub fn flag_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.text(name).map(str::to_ascii_lowercase).as_deref() {
            None => Ok(default),
            Some("true" | "1" | "yes" | "on") => Ok(true),
            Some("false" | "0" | "no" | "off") => Ok(false),
            Some(other) => Err(WandlerError::Validation(format!(
                "{name} must be true or false, got '{other}'"
            ))),
        }
    }

    /// The single required file in `field`, validated against `kind`.
    pub fn file(&mut self, field: &str, kind: UploadKind) -> Result<UploadedFile> {
        self.optional_file(field, kind)?
            .ok_or_else(|| WandlerError::Validation(format!("missing file field '{field}'")))
    }

    pub fn optional_file(&mut self, field: &str, kind: UploadKind) -> Result<Option<UploadedFile>> {
        let Some(position) = self.files.iter().position(|f| f.field == field) else {
            return Ok(None);
        };
        let file = self.files.remove(position);
        file.validate(kind)?;
        Ok(Some(file))
    }

    /// Every file in `field`, in upload order; at least one is required.
    pub fn files(&mut self, field: &str, kind: UploadKind) -> Result<Vec<UploadedFile>> {
        let (matching, rest): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.files).into_iter().partition(|f| f.field == field);
        self.files = rest;
        if matching.is_empty() {
            return Err(WandlerError::Validation(format!("missing file field '{field}'")));
        }
        for file in &matching {
            file.validate(kind)?;
        }
        Ok(matching)
    }
}

/// Client-supplied names may carry directories from either platform.
fn base_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("upload")
        .to_owned()
}
