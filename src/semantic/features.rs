//! Whole-text scalar statistics (embedding slots 0..10).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::frequency::FrequencyTable;
use super::normalize::NormalizedText;

/// Number of scalar slots at the head of every embedding.
pub const SCALAR_FEATURES: usize = 10;

static SENTENCE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+").expect("Failed to compile sentence regex"));

/// Compute the ten scalar features.
///
/// `case_text` is the text the capital-letter ratio is measured over. The
/// embedder passes either the normalized text or the raw input depending on
/// configuration; every other statistic runs over `normalized`.
pub fn scalar_features(
    normalized: &NormalizedText,
    words: &FrequencyTable,
    case_text: &str,
) -> [f32; SCALAR_FEATURES] {
    let mut features = [0.0f32; SCALAR_FEATURES];
    if normalized.is_empty() {
        return features;
    }

    let text_len = normalized.char_len() as f32;
    let token_count = normalized.tokens.len() as f32;

    features[0] = text_len / 1000.0;
    features[1] = token_count / 100.0;
    features[2] = words.distinct() as f32 / token_count;
    features[3] = average_token_length(&normalized.tokens) / 10.0;
    features[4] = entropy(words) / 10.0;
    features[5] = capital_ratio(case_text);
    features[6] = char_ratio(&normalized.text, |c| c.is_ascii_digit());
    features[7] = char_ratio(&normalized.text, |c| c.is_ascii_punctuation());
    features[8] = readability(&normalized.tokens);
    features[9] = sentence_complexity(&normalized.text);

    features
}

fn average_token_length(tokens: &[String]) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let total: usize = tokens.iter().map(|t| t.chars().count()).sum();
    total as f32 / tokens.len() as f32
}

/// Shannon entropy (base 2) of the count distribution.
fn entropy(words: &FrequencyTable) -> f32 {
    let total = words.total();
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    let entropy: f64 = words
        .counts()
        .map(|count| {
            let p = count as f64 / total;
            if p > 0.0 {
                -p * p.log2()
            } else {
                0.0
            }
        })
        .sum();

    entropy as f32
}

/// Share of uppercase letters among all letters; 0 when there are no letters.
fn capital_ratio(text: &str) -> f32 {
    let mut letters = 0usize;
    let mut capitals = 0usize;
    for c in text.chars().filter(|c| c.is_alphabetic()) {
        letters += 1;
        if c.is_uppercase() {
            capitals += 1;
        }
    }

    if letters == 0 {
        return 0.0;
    }
    capitals as f32 / letters as f32
}

fn char_ratio(text: &str, predicate: impl Fn(char) -> bool) -> f32 {
    let mut total = 0usize;
    let mut matching = 0usize;
    for c in text.chars() {
        total += 1;
        if predicate(c) {
            matching += 1;
        }
    }

    if total == 0 {
        return 0.0;
    }
    matching as f32 / total as f32
}

/// `(tokens_per_sentence * 0.39 + chars_per_token * 11.8) / 100`.
///
/// Sentences are approximated as one plus the number of tokens ending in `.`, `!` or `?`.
fn readability(tokens: &[String]) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }

    let mut total_chars = 0usize;
    let mut sentences = 1usize;
    for token in tokens {
        total_chars += token.chars().count();
        if token.ends_with(&['.', '!', '?'][..]) {
            sentences += 1;
        }
    }

    let tokens_per_sentence = tokens.len() as f32 / sentences as f32;
    let chars_per_token = total_chars as f32 / tokens.len() as f32;

    (tokens_per_sentence * 0.39 + chars_per_token * 11.8) / 100.0
}

/// Mean distinct-token count per sentence, divided by 20.
///
/// Zero unless splitting on `[.!?]+` yields at least two pieces.
fn sentence_complexity(text: &str) -> f32 {
    let pieces: Vec<&str> = SENTENCE_BREAK.split(text).collect();
    if pieces.len() <= 1 {
        return 0.0;
    }

    let mut total = 0.0f64;
    let mut sentences = 0usize;
    for piece in pieces {
        let tokens: Vec<&str> = piece.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let distinct: HashSet<&str> = tokens.iter().copied().collect();
        let token_count = tokens.len() as f64;
        total += token_count * (distinct.len() as f64 / token_count);
        sentences += 1;
    }

    if sentences == 0 {
        return 0.0;
    }
    (total / sentences as f64) as f32 / 20.0
}
