//! Similarity Scorer — TF-IDF over a two-document corpus, then cosine similarity.
//!
//! The corpus is exactly {job description, resume} of the current request. The
//! vocabulary and IDF statistics are rebuilt on every call and never cached: a
//! shared corpus would change IDF and with it the meaning of the score.
//!
//! Weighting:
//! - tf(t, d)  = raw count of `t` in `d`
//! - idf(t)    = ln((1 + N) / (1 + df(t))) + 1, N = 2
//! - w(t, d)   = tf · idf, each row L2-normalized
//! - score     = 100 · (w_jd · w_resume)

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::screening::normalize::NormalizedText;

const CORPUS_SIZE: f64 = 2.0;

/// Which side of the comparison had no terms left after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySide {
    JobDescription,
    Resume,
    Both,
}

impl fmt::Display for EmptySide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmptySide::JobDescription => "job description",
            EmptySide::Resume => "resume",
            EmptySide::Both => "both",
        })
    }
}

/// A vector space cannot be built: one or both documents have no terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot vectorize: {empty_side} has no terms")]
pub struct DegenerateInput {
    pub empty_side: EmptySide,
}

/// Vocabulary plus a 2×|vocabulary| weight matrix (row 0 = job description,
/// row 1 = resume). Terms are kept in lexical order so every computation over
/// the matrix runs in a fixed order and repeats bit-for-bit.
#[derive(Debug, Clone)]
pub struct TermVectorSpace {
    vocabulary: Vec<String>,
    weights: [Vec<f64>; 2],
}

impl TermVectorSpace {
    pub fn fit(jd: &NormalizedText, resume: &NormalizedText) -> Result<Self, DegenerateInput> {
        let empty_side = match (jd.is_empty(), resume.is_empty()) {
            (true, true) => Some(EmptySide::Both),
            (true, false) => Some(EmptySide::JobDescription),
            (false, true) => Some(EmptySide::Resume),
            (false, false) => None,
        };
        if let Some(empty_side) = empty_side {
            return Err(DegenerateInput { empty_side });
        }

        let mut counts: BTreeMap<&str, [u32; 2]> = BTreeMap::new();
        for (doc, text) in [jd, resume].into_iter().enumerate() {
            for token in text.tokens() {
                counts.entry(token).or_default()[doc] += 1;
            }
        }

        let mut vocabulary = Vec::with_capacity(counts.len());
        let mut weights = [
            Vec::with_capacity(counts.len()),
            Vec::with_capacity(counts.len()),
        ];
        for (term, tf) in counts {
            let df = tf.iter().filter(|&&c| c > 0).count() as f64;
            let idf = ((1.0 + CORPUS_SIZE) / (1.0 + df)).ln() + 1.0;
            vocabulary.push(term.to_string());
            for (row, count) in weights.iter_mut().zip(tf) {
                row.push(f64::from(count) * idf);
            }
        }

        for row in &mut weights {
            l2_normalize(row);
        }

        Ok(Self {
            vocabulary,
            weights,
        })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Cosine similarity of the two rows. Rows are unit length, so this is the dot product.
    pub fn cosine(&self) -> f64 {
        self.weights[0]
            .iter()
            .zip(&self.weights[1])
            .map(|(a, b)| a * b)
            .sum()
    }
}

/// Similarity of two normalized texts as a percentage in [0, 100].
pub fn score(jd: &NormalizedText, resume: &NormalizedText) -> Result<f64, DegenerateInput> {
    let space = TermVectorSpace::fit(jd, resume)?;
    debug!(vocabulary = space.vocabulary_len(), "built term space");
    Ok((space.cosine() * 100.0).clamp(0.0, 100.0))
}

fn l2_normalize(row: &mut [f64]) {
    let norm = row.iter().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for w in row.iter_mut() {
            *w /= norm;
        }
    }
}
