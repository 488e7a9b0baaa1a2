//! Scoring pipeline: validate → extract → (OCR if blank PDF) → normalize → score → classify.
//!
//! Every request owns its data end to end. The only shared inputs are the
//! read-only stopword set and the OCR engine.

use serde::Serialize;
use tracing::{debug, info};

use crate::screening::classify::{classify, Tier};
use crate::screening::document::{Document, DocumentFormat};
use crate::screening::error::ScreeningError;
use crate::screening::extract::extract;
use crate::screening::normalize::normalize;
use crate::screening::ocr::OcrEngine;
use crate::screening::similarity::{self, DegenerateInput, EmptySide};
use crate::screening::stopwords::StopwordSet;

#[derive(Debug, Clone)]
pub struct ScoreRequest {
    pub job_description: String,
    pub resume: Option<Document>,
    /// Caller-chosen threshold in [0, 100].
    pub threshold: f64,
}

/// Diagnostic counts reported with every result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextStats {
    /// Characters of resume text that went into normalization (after OCR, if it ran).
    pub resume_text_length: usize,
    pub jd_word_count: usize,
    pub resume_word_count: usize,
    pub used_ocr: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// 0 – 100
    pub score: f64,
    pub tier: Tier,
    #[serde(flatten)]
    pub stats: TextStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl MatchResult {
    /// Zero-score result for a request whose normalized text left nothing to compare.
    pub fn degenerate(empty_side: EmptySide, stats: TextStats, threshold: f64) -> Self {
        Self {
            score: 0.0,
            tier: classify(0.0, threshold),
            stats,
            diagnostic: Some(format!(
                "No comparable words left in the {empty_side} after removing punctuation and stopwords; score set to 0."
            )),
        }
    }
}

/// Resume text plus how it was obtained.
#[derive(Debug, Clone)]
pub struct ResumeText {
    pub text: String,
    pub used_ocr: bool,
}

/// Runs one scoring request.
///
/// Fails with `DegenerateInput` when either side normalizes to nothing; callers
/// turn that into `MatchResult::degenerate` instead of surfacing it as a fault.
pub async fn evaluate(
    request: ScoreRequest,
    stopwords: &StopwordSet,
    ocr: &dyn OcrEngine,
) -> Result<MatchResult, ScreeningError> {
    if request.job_description.trim().is_empty() {
        return Err(ScreeningError::EmptyJobDescription);
    }
    let document = match request.resume {
        Some(doc) if !doc.is_empty() => doc,
        _ => return Err(ScreeningError::MissingResume),
    };

    let resume = resume_text(&document, ocr).await?;

    let jd_clean = normalize(&request.job_description, stopwords);
    let resume_clean = normalize(&resume.text, stopwords);

    let stats = TextStats {
        resume_text_length: resume.text.chars().count(),
        jd_word_count: jd_clean.word_count(),
        resume_word_count: resume_clean.word_count(),
        used_ocr: resume.used_ocr,
    };
    debug!(
        jd_words = stats.jd_word_count,
        resume_words = stats.resume_word_count,
        "normalized inputs"
    );

    let score = similarity::score(&jd_clean, &resume_clean)
        .map_err(|DegenerateInput { empty_side }| ScreeningError::DegenerateInput {
            empty_side,
            stats,
        })?;
    let tier = classify(score, request.threshold);

    info!(
        score,
        tier = ?tier,
        threshold = request.threshold,
        used_ocr = stats.used_ocr,
        "resume scored"
    );

    Ok(MatchResult {
        score,
        tier,
        stats,
        diagnostic: None,
    })
}

/// Stage 1 extracts embedded text. Stage 2 (OCR) runs only for a PDF whose
/// stage-1 text is blank, and at most once.
pub async fn resume_text(
    document: &Document,
    ocr: &dyn OcrEngine,
) -> Result<ResumeText, ScreeningError> {
    let text = extract(document).await?;

    if document.format() == DocumentFormat::Pdf && text.trim().is_empty() {
        info!(
            bytes = document.len(),
            "PDF has no embedded text, falling back to OCR"
        );
        let text = ocr.recognize(document.bytes().clone()).await?;
        return Ok(ResumeText {
            text,
            used_ocr: true,
        });
    }

    Ok(ResumeText {
        text,
        used_ocr: false,
    })
}
