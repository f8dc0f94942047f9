// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for API clients.
//
// Every technical error is mapped to a plain sentence plus a suggestion, and
// classified so the HTTP layer can pick a status code without matching on
// individual variants.

use crate::error::WandlerError;

/// Who is responsible for an error, from the client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input shape, type, size, or password. The client must change the request.
    Client,
    /// The referenced artifact does not exist.
    NotFound,
    /// The referenced artifact existed but has expired and was purged.
    Gone,
    /// The document could not be processed (render, geometry, codec failures).
    Processing,
    /// Unexpected server-side failure.
    Internal,
}

impl ErrorClass {
    /// HTTP status code for this class.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Client | Self::Processing => 400,
            Self::NotFound => 404,
            Self::Gone => 410,
            Self::Internal => 500,
        }
    }
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary including the underlying cause where useful.
    pub message: String,
    /// What the client should try next.
    pub suggestion: String,
    /// Whether repeating the identical request may succeed.
    pub retriable: bool,
    /// Drives the HTTP status code.
    pub class: ErrorClass,
}

/// Convert a `WandlerError` into a `HumanError`.
pub fn humanize_error(err: &WandlerError) -> HumanError {
    match err {
        // -- Client input --
        WandlerError::Validation(detail) => HumanError {
            message: detail.clone(),
            suggestion: "Check the uploaded file type, size, and form fields.".into(),
            retriable: false,
            class: ErrorClass::Client,
        },

        WandlerError::NotFound(detail) => HumanError {
            message: format!("File not found: {detail}"),
            suggestion: "The download link may be wrong or the file was already deleted.".into(),
            retriable: false,
            class: ErrorClass::NotFound,
        },

        WandlerError::Gone(detail) => HumanError {
            message: format!("File has expired: {detail}"),
            suggestion: "Converted files are kept for a limited time. Run the conversion again."
                .into(),
            retriable: false,
            class: ErrorClass::Gone,
        },

        // -- Document security --
        WandlerError::IncorrectPassword => HumanError {
            message: "Incorrect password.".into(),
            suggestion: "Check the password and try again.".into(),
            retriable: false,
            class: ErrorClass::Client,
        },

        WandlerError::UnlockFailed(detail) => HumanError {
            message: format!("Could not unlock the PDF automatically: {detail}"),
            suggestion: "Provide the document password to unlock it.".into(),
            retriable: false,
            class: ErrorClass::Client,
        },

        WandlerError::Encryption(detail) => HumanError {
            message: format!("PDF encryption failed: {detail}"),
            suggestion: "The document structure may be unsupported. Try re-saving it first."
                .into(),
            retriable: false,
            class: ErrorClass::Processing,
        },

        // -- Processing --
        WandlerError::Render(detail) => processing("Page rendering failed", detail),
        WandlerError::InvalidGeometry(detail) => processing("Invalid page geometry", detail),
        WandlerError::Pdf(detail) => processing("PDF processing failed", detail),
        WandlerError::Presentation(detail) => {
            processing("Presentation processing failed", detail)
        }
        WandlerError::Image(detail) => processing("Image processing failed", detail),

        WandlerError::Fetch(detail) => HumanError {
            message: format!("Could not download the source document: {detail}"),
            suggestion: "Check that the URL is reachable and points to a PDF.".into(),
            retriable: true,
            class: ErrorClass::Processing,
        },

        // -- Storage / runtime --
        WandlerError::Timeout(limit) => HumanError {
            message: format!("Conversion took longer than {} seconds.", limit.as_secs()),
            suggestion: "Try a smaller document or fewer pages.".into(),
            retriable: true,
            class: ErrorClass::Internal,
        },

        WandlerError::IntegrityMismatch { .. } => HumanError {
            message: "The stored file is corrupted.".into(),
            suggestion: "Run the conversion again.".into(),
            retriable: false,
            class: ErrorClass::Internal,
        },

        WandlerError::Storage(detail) | WandlerError::Internal(detail) => internal(detail),
        WandlerError::Io(err) => internal(&err.to_string()),
        WandlerError::Serialization(err) => internal(&err.to_string()),
    }
}

fn processing(summary: &str, detail: &str) -> HumanError {
    HumanError {
        message: format!("{summary}: {detail}"),
        suggestion: "The file may be damaged or use features that are not supported.".into(),
        retriable: false,
        class: ErrorClass::Processing,
    }
}

fn internal(detail: &str) -> HumanError {
    HumanError {
        message: format!("Internal server error: {detail}"),
        suggestion: "Please try again later.".into(),
        retriable: true,
        class: ErrorClass::Internal,
    }
}
