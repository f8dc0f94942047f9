// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP error responses — every failure leaves the service as a JSON body
// `{success: false, message, error_code, suggestion}` with the status code
// chosen by the error's class.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};
use wandler_core::error::WandlerError;
use wandler_core::human_errors::{ErrorClass, humanize_error};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct ApiError(pub WandlerError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    error_code: &'static str,
    suggestion: String,
    retriable: bool,
}

impl From<WandlerError> for ApiError {
    fn from(err: WandlerError) -> Self {
        Self(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self(WandlerError::Validation(format!("malformed form data: {}", err.body_text())))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let human = humanize_error(&self.0);
        let status = StatusCode::from_u16(human.class.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match human.class {
            ErrorClass::Internal => error!(error = %self.0, "request failed"),
            _ => warn!(error = %self.0, status = status.as_u16(), "request rejected"),
        }

        let body = ErrorBody {
            success: false,
            message: human.message,
            error_code: self.0.code(),
            suggestion: human.suggestion,
            retriable: human.retriable,
        };
        (status, Json(body)).into_response()
    }
}
