//! Axum route handlers for the screening API.
//!
//! This is the upload boundary: the multipart form is read here and the document
//! format tag is decided here, once. Nothing past this point looks at file names.

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::screening::document::{Document, DocumentFormat};
use crate::screening::error::ScreeningError;
use crate::screening::pipeline::{evaluate, MatchResult, ScoreRequest};
use crate::screening::report::{render_report, REPORT_FILENAME};
use crate::state::AppState;

const PDF_MIME: &str = "application/pdf";
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const DEFAULT_RESUME_NAME: &str = "resume";

// ────────────────────────────────────────────────────────────────────────────
// Form parsing
// ────────────────────────────────────────────────────────────────────────────

/// The resume file as uploaded, before its format is decided.
#[derive(Debug)]
struct Upload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

#[derive(Debug, Default)]
struct MatchForm {
    job_description: Option<String>,
    resume: Option<Upload>,
    threshold: Option<String>,
}

impl MatchForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MatchForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "job_description" => {
                    form.job_description = Some(field.text().await.map_err(multipart_error)?);
                }
                "resume" => {
                    let filename = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(multipart_error)?;
                    form.resume = Some(Upload {
                        filename,
                        content_type,
                        bytes,
                    });
                }
                "threshold" => {
                    form.threshold = Some(field.text().await.map_err(multipart_error)?);
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Validates in the order the pipeline promises: job description, then resume
    /// presence, then format, then threshold. Returns the request and the resume file name.
    fn into_request(self, default_threshold: f64) -> Result<(ScoreRequest, String), AppError> {
        let job_description = self.job_description.unwrap_or_default();
        if job_description.trim().is_empty() {
            return Err(ScreeningError::EmptyJobDescription.into());
        }

        let upload = match self.resume {
            Some(upload) if !upload.bytes.is_empty() => upload,
            _ => return Err(ScreeningError::MissingResume.into()),
        };
        let format = detect_format(upload.content_type.as_deref(), upload.filename.as_deref())?;

        let threshold = parse_threshold(self.threshold.as_deref(), default_threshold)?;

        let filename = upload
            .filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RESUME_NAME.to_string());

        Ok((
            ScoreRequest {
                job_description,
                resume: Some(Document::new(upload.bytes, format)),
                threshold,
            },
            filename,
        ))
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("invalid multipart form: {}", e.body_text()))
    }
}

/// Declared content type wins; the file extension is the fallback.
fn detect_format(
    content_type: Option<&str>,
    filename: Option<&str>,
) -> Result<DocumentFormat, ScreeningError> {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());

    match mime.as_deref() {
        Some(PDF_MIME) => return Ok(DocumentFormat::Pdf),
        Some(DOCX_MIME) => return Ok(DocumentFormat::Docx),
        _ => {}
    }

    match filename.and_then(|name| name.rsplit_once('.')) {
        Some((_, extension)) => extension.parse(),
        None => Err(ScreeningError::UnsupportedFormat(
            mime.unwrap_or_else(|| "unknown".to_string()),
        )),
    }
}

fn parse_threshold(raw: Option<&str>, default_threshold: f64) -> Result<f64, AppError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default_threshold),
        Some(raw) => raw,
    };
    let threshold: f64 = raw
        .parse()
        .map_err(|_| AppError::Validation(format!("threshold must be a number, got '{raw}'")))?;
    if !(0.0..=100.0).contains(&threshold) {
        return Err(AppError::Validation(format!(
            "threshold must be between 0 and 100, got {threshold}"
        )));
    }
    Ok(threshold)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/match
///
/// Multipart form: `job_description`, `resume` (PDF or DOCX), optional `threshold`.
/// Returns the score, tier and diagnostic counts.
pub async fn handle_match(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MatchResult>, AppError> {
    let form = MatchForm::read(multipart).await?;
    let (request, _filename) = form.into_request(state.config.match_threshold)?;
    let result = score_request(&state, request).await?;
    Ok(Json(result))
}

/// POST /api/v1/match/report
///
/// Same form as `/api/v1/match`; returns the plain-text report as a download.
pub async fn handle_match_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = MatchForm::read(multipart).await?;
    let (request, filename) = form.into_request(state.config.match_threshold)?;
    let result = score_request(&state, request).await?;

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{REPORT_FILENAME}\""),
        ),
    ];
    Ok((headers, render_report(result.score, &filename)))
}

/// Runs the pipeline for one request inside its own span. A degenerate request
/// short-circuits to a zero score with a diagnostic instead of an error.
async fn score_request(state: &AppState, request: ScoreRequest) -> Result<MatchResult, AppError> {
    let threshold = request.threshold;
    let span = info_span!(
        "match_request",
        request_id = %Uuid::new_v4(),
        format = request.resume.as_ref().map(|d| d.format().as_str()).unwrap_or("none"),
        bytes = request.resume.as_ref().map(|d| d.len()).unwrap_or(0),
    );

    let outcome = evaluate(request, state.stopwords, state.ocr.as_ref())
        .instrument(span.clone())
        .await;

    match outcome {
        Ok(result) => Ok(result),
        Err(ScreeningError::DegenerateInput { empty_side, stats }) => {
            span.in_scope(|| {
                warn!(
                    empty_side = %empty_side,
                    resume_chars = stats.resume_text_length,
                    "nothing comparable after normalization, reporting zero score"
                )
            });
            Ok(MatchResult::degenerate(empty_side, stats, threshold))
        }
        Err(e) => Err(e.into()),
    }
}
