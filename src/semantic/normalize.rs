//! Text canonicalization ahead of feature extraction.
//!
//! Steps, in order:
//! 1. Lowercase
//! 2. Replace runs of anything that is not a letter, number or whitespace with one space
//! 3. Collapse whitespace runs to a single space
//! 4. Trim

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{L}\p{N}\s]+").expect("Failed to compile non-word regex")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

/// Normalized text together with its whitespace-separated tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    pub tokens: Vec<String>,
}

impl NormalizedText {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Length of the normalized text in chars.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Canonicalize raw text and split it into tokens.
pub fn normalize(raw: &str) -> NormalizedText {
    let lowered = raw.to_lowercase();
    let stripped = NON_WORD_RUN.replace_all(&lowered, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    let text = collapsed.trim().to_string();

    let tokens = text.split_whitespace().map(str::to_string).collect();

    NormalizedText { text, tokens }
}
