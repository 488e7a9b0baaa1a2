//! Text normalization: lowercase, strip ASCII punctuation, tokenize, drop stopwords.

use std::fmt;

use crate::screening::stopwords::StopwordSet;

/// Space-joined lowercase tokens with punctuation and stopwords removed.
/// Token order follows the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|t| !t.is_empty())
    }

    pub fn word_count(&self) -> usize {
        self.tokens().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes raw text for comparison.
///
/// Steps, in order:
/// 1. lowercase every character
/// 2. delete every ASCII punctuation character (no space is inserted, so `ci/cd` becomes `cicd`)
/// 3. split on whitespace
/// 4. drop stopwords
/// 5. rejoin with single spaces
///
/// Pure and locale-independent. Empty input yields empty output.
pub fn normalize(text: &str, stopwords: &StopwordSet) -> NormalizedText {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();

    let kept: Vec<&str> = stripped
        .split_whitespace()
        .filter(|token| !stopwords.contains(token))
        .collect();

    NormalizedText(kept.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(text: &str) -> NormalizedText {
        normalize(text, StopwordSet::english())
    }

    #[test]
    fn test_lowercases_strips_punctuation_and_stopwords() {
        let out = norm("Senior Python Engineer, 5 years AWS and Docker");
        assert_eq!(out.as_str(), "senior python engineer 5 years aws docker");
        assert_eq!(out.word_count(), 7);
    }

    #[test]
    fn test_preserves_token_order() {
        let out = norm("Docker before Kubernetes; then Terraform!");
        assert_eq!(out.as_str(), "docker kubernetes terraform");
    }

    #[test]
    fn test_punctuation_is_deleted_not_replaced() {
        assert_eq!(norm("CI/CD, node.js & C++").as_str(), "cicd nodejs c");
    }

    #[test]
    fn test_empty_and_blank_input_yield_empty_output() {
        assert!(norm("").is_empty());
        assert!(norm("  \n\t ").is_empty());
        assert_eq!(norm("").word_count(), 0);
    }

    #[test]
    fn test_only_stopwords_yield_empty_output() {
        assert!(norm("The and of, with a!").is_empty());
    }

    #[test]
    fn test_output_has_no_punctuation_or_stopwords() {
        let samples = [
            "Led a team of 5 engineers; shipped v2.0 (on time!) — really.",
            "I'm the one who's done it: \"quoted\" [brackets] {braces} <angle> ~tilde~",
            "Don't stop: it's what we've wanted all along...",
        ];
        let stopwords = StopwordSet::english();
        for sample in samples {
            let out = normalize(sample, stopwords);
            assert!(
                !out.as_str().chars().any(|c| c.is_ascii_punctuation()),
                "punctuation survived in {out:?}"
            );
            assert!(
                out.tokens().all(|t| !stopwords.contains(t)),
                "stopword survived in {out:?}"
            );
        }
    }

    #[test]
    fn test_is_deterministic() {
        let text = "Rust, Go, and Python — distributed systems at scale.";
        assert_eq!(norm(text), norm(text));
    }

    #[test]
    fn test_non_ascii_text_is_lowercased_and_kept() {
        assert_eq!(norm("ÉCOLE Zürich").as_str(), "école zürich");
    }

    #[test]
    fn test_whitespace_runs_collapse_to_single_spaces() {
        assert_eq!(norm("rust\n\n\tgo    python").as_str(), "rust go python");
    }
}
