// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Wandler.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all Wandler operations.
#[derive(Debug, Error)]
pub enum WandlerError {
    // -- Client input --
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("artifact expired: {0}")]
    Gone(String),

    // -- Document security --
    #[error("incorrect password")]
    IncorrectPassword,

    #[error("could not unlock document automatically: {0}")]
    UnlockFailed(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    // -- Processing --
    #[error("page rendering failed: {0}")]
    Render(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("presentation operation failed: {0}")]
    Presentation(String),

    #[error("image processing failed: {0}")]
    Image(String),

    #[error("remote source fetch failed: {0}")]
    Fetch(String),

    // -- Storage / runtime --
    #[error("artifact storage error: {0}")]
    Storage(String),

    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WandlerError {
    /// Stable machine-readable code reported alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Gone(_) => "gone",
            Self::IncorrectPassword => "incorrect_password",
            Self::UnlockFailed(_) => "unlock_failed",
            Self::Encryption(_) => "encryption_error",
            Self::Render(_) => "render_error",
            Self::InvalidGeometry(_) => "invalid_geometry",
            Self::Pdf(_) => "pdf_error",
            Self::Presentation(_) => "presentation_error",
            Self::Image(_) => "image_error",
            Self::Fetch(_) => "fetch_error",
            Self::Storage(_) => "storage_error",
            Self::IntegrityMismatch { .. } => "integrity_mismatch",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal_error",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WandlerError>;
