use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::screening::ScreeningError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Screening(#[from] ScreeningError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::Screening(e) => match e {
                ScreeningError::EmptyJobDescription => (
                    StatusCode::BAD_REQUEST,
                    "EMPTY_JOB_DESCRIPTION",
                    "Please paste a job description.".to_string(),
                ),
                ScreeningError::MissingResume => (
                    StatusCode::BAD_REQUEST,
                    "MISSING_RESUME",
                    "Please upload a resume (PDF or DOCX).".to_string(),
                ),
                ScreeningError::UnsupportedFormat(_) => (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "UNSUPPORTED_FORMAT",
                    e.to_string(),
                ),
                ScreeningError::MalformedDocument(_) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "MALFORMED_DOCUMENT",
                    e.to_string(),
                ),
                ScreeningError::OcrUnavailable(msg) => {
                    tracing::error!("OCR unavailable: {msg}");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "OCR_UNAVAILABLE",
                        "The resume looks scanned and text recognition is unavailable."
                            .to_string(),
                    )
                }
                ScreeningError::OcrTimedOut { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "OCR_TIMEOUT",
                    e.to_string(),
                ),
                ScreeningError::DegenerateInput { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "DEGENERATE_INPUT",
                    e.to_string(),
                ),
            },
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
