// Resume screening: scores how well a resume matches a job description.
// Stages: extract (PDF/DOCX) → OCR fallback for blank PDFs → normalize → TF-IDF cosine → tier.
// OCR is the only expensive stage and runs strictly behind the blank-text gate.

pub mod classify;
pub mod document;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod report;
pub mod similarity;
pub mod stopwords;

#[cfg(test)]
pub mod fixtures;

// Re-export the API consumed by main, state and routes.
pub use error::ScreeningError;
pub use ocr::{OcrEngine, OcrSettings, TesseractOcr};
pub use stopwords::StopwordSet;
