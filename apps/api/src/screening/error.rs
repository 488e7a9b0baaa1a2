use thiserror::Error;

use crate::screening::pipeline::TextStats;
use crate::screening::similarity::EmptySide;

/// Failure kinds of one scoring request.
///
/// Validation failures (`EmptyJobDescription`, `MissingResume`) are raised before
/// any extraction work. `DegenerateInput` is the only kind a caller is expected to
/// recover from, by reporting a score of 0 together with a diagnostic.
#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("job description is empty")]
    EmptyJobDescription,

    #[error("no resume document was supplied")]
    MissingResume,

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("document could not be parsed: {0}")]
    MalformedDocument(String),

    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR did not finish within {secs}s")]
    OcrTimedOut { secs: u64 },

    #[error("no comparable terms left after normalization ({empty_side} side empty)")]
    DegenerateInput { empty_side: EmptySide, stats: TextStats },
}
