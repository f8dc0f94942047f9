// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Wandler conversion service.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WandlerError;

/// Opaque identifier for a stored conversion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier supplied by a client. Anything that is not a UUID
    /// cannot name an artifact, so it is reported as not found.
    pub fn parse(raw: &str) -> Result<Self, WandlerError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| WandlerError::NotFound(raw.to_owned()))
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// File kinds the service produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Pdf,
    Pptx,
    Jpg,
}

impl ArtifactKind {
    /// MIME type used when streaming the artifact back to a client.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Jpg => "image/jpeg",
        }
    }

    /// Canonical file extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
            Self::Jpg => "jpg",
        }
    }

    /// Infer the kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "pptx" => Some(Self::Pptx),
            "jpg" | "jpeg" => Some(Self::Jpg),
            _ => None,
        }
    }
}

/// The operation that produced an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    PdfToPresentation,
    PresentationToPdf,
    ImagesToPdf,
    PdfToImage,
    Unlock,
    Lock,
    Compress,
    /// An unmodified upload kept so a password can be supplied later.
    PendingUnlock,
}

/// How an encrypted document was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockMethod {
    NotEncrypted,
    EmptyPassword,
    CommonPassword,
    PageRecovery,
    UserPassword,
    FailedAutomatic,
}

/// Compression aggressiveness for PDF re-serialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = WandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(WandlerError::Validation(format!(
                "invalid compression level '{other}', expected low, medium, or high"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Page layout policies
// ---------------------------------------------------------------------------

/// Target page size for generated PDF pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSizePolicy {
    #[default]
    A4,
    UsLetter,
    /// Canvas matches the source image or page.
    FitToSource,
}

impl FromStr for PageSizePolicy {
    type Err = WandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(Self::A4),
            "us_letter" | "letter" => Ok(Self::UsLetter),
            "fit" | "fit_to_source" => Ok(Self::FitToSource),
            other => Err(WandlerError::Validation(format!(
                "invalid page size '{other}', expected a4, us_letter, or fit"
            ))),
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Natural orientation of a `width` x `height` area. Squares count as portrait.
    pub fn of(width: f64, height: f64) -> Self {
        if width > height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

impl FromStr for Orientation {
    type Err = WandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portrait" => Ok(Self::Portrait),
            "landscape" => Ok(Self::Landscape),
            other => Err(WandlerError::Validation(format!(
                "invalid orientation '{other}', expected portrait or landscape"
            ))),
        }
    }
}

/// Margin reserved around placed images, in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginPolicy {
    None,
    #[default]
    Small,
    Large,
}

impl MarginPolicy {
    pub fn points(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Small => 20.0,
            Self::Large => 50.0,
        }
    }
}

impl FromStr for MarginPolicy {
    type Err = WandlerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "no_margin" => Ok(Self::None),
            "small" => Ok(Self::Small),
            "large" | "big" => Ok(Self::Large),
            other => Err(WandlerError::Validation(format!(
                "invalid margin '{other}', expected none, small, or large"
            ))),
        }
    }
}

/// Rule for scaling a source image into a destination rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Preserve aspect ratio, fit inside the margins, centre.
    #[default]
    Contain,
    /// Stretch to the full canvas, ignoring margins and aspect ratio.
    Fill,
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// Conversion-specific details recorded with an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_level: Option<CompressionLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_method: Option<UnlockMethod>,
    /// Zero-based indices of pages replaced by an error placeholder.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded_pages: Vec<usize>,
    /// Free-form request options echoed back to the client.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl ArtifactMetadata {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            source_name: None,
            page_count: None,
            page_number: None,
            image_count: None,
            compression_level: None,
            unlock_method: None,
            degraded_pages: Vec::new(),
            options: serde_json::Map::new(),
        }
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn with_page_count(mut self, count: usize) -> Self {
        self.page_count = Some(count);
        self
    }

    pub fn with_page_number(mut self, page: u32) -> Self {
        self.page_number = Some(page);
        self
    }

    pub fn with_image_count(mut self, count: usize) -> Self {
        self.image_count = Some(count);
        self
    }

    pub fn with_compression_level(mut self, level: CompressionLevel) -> Self {
        self.compression_level = Some(level);
        self
    }

    pub fn with_unlock_method(mut self, method: UnlockMethod) -> Self {
        self.unlock_method = Some(method);
        self
    }

    pub fn with_degraded_pages(mut self, pages: Vec<usize>) -> Self {
        self.degraded_pages = pages;
        self
    }

    pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.to_owned(), value.into());
        self
    }
}

/// A named, persisted conversion result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    /// Name offered to the client when downloading.
    pub filename: String,
    /// Key of the bytes in the backing blob store.
    pub storage_key: String,
    pub size_bytes: u64,
    /// SHA-256 of the stored bytes (lowercase hex).
    pub sha256: String,
    pub kind: ArtifactKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub metadata: ArtifactMetadata,
}

impl Artifact {
    /// An artifact is expired strictly after its expiration instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Age relative to `now`; zero if the clock went backwards.
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.created_at).max(chrono::Duration::zero())
    }
}

/// Lifecycle state of the background sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweeperStatus {
    Stopped,
    Running,
}
