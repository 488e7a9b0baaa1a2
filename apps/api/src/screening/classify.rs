//! Maps a score and a threshold to a presentation tier.

use serde::Serialize;

/// Fraction of the threshold at which a score still counts as a close match.
pub const CLOSE_MATCH_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Match,
    CloseMatch,
    BelowThreshold,
}

/// - `Match`: score ≥ threshold
/// - `CloseMatch`: threshold·0.7 ≤ score < threshold
/// - `BelowThreshold`: everything else, NaN included
pub fn classify(score: f64, threshold: f64) -> Tier {
    if score >= threshold {
        Tier::Match
    } else if score >= threshold * CLOSE_MATCH_RATIO {
        Tier::CloseMatch
    } else {
        Tier::BelowThreshold
    }
}
