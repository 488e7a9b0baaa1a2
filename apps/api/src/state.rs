use std::sync::Arc;

use crate::config::Config;
use crate::screening::{OcrEngine, StopwordSet};

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Holds only read-only, request-independent resources. Vocabularies and vector
/// spaces are built per request and never stored here.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// English stopwords, loaded once at startup.
    pub stopwords: &'static StopwordSet,
    /// Pluggable OCR backend. Default: TesseractOcr.
    pub ocr: Arc<dyn OcrEngine>,
}
