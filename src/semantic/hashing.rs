//! Feature hashing of whole words into fixed bucket ranges.
//!
//! Two regions of the embedding are filled here:
//! - word frequency: `count / token_count` added at `hash(word) % word_buckets`
//! - word position: `index / token_count` added at `hash(word) % position_buckets`
//!
//! Buckets accumulate, so colliding keys stack their contributions.

use super::frequency::FrequencyTable;

/// Default polynomial multiplier for [`polynomial_hash`].
pub const DEFAULT_HASH_MULTIPLIER: i64 = 31;

/// Fold each code point into `hash * multiplier + code_point` with 64-bit
/// wrapping arithmetic and return the absolute value.
pub fn polynomial_hash(key: &str, multiplier: i64) -> u64 {
    let hash = key.chars().fold(0i64, |hash, c| {
        hash.wrapping_mul(multiplier).wrapping_add(c as i64)
    });
    hash.unsigned_abs()
}

/// Bucket index of `key` within a region of `buckets` slots.
pub fn bucket(key: &str, multiplier: i64, buckets: usize) -> usize {
    (polynomial_hash(key, multiplier) % buckets as u64) as usize
}

/// Adds every word's relative frequency into `region`.
///
/// Words are visited in rank order (count descending, then lexicographic)
/// so floating point accumulation is reproducible.
pub fn hash_word_frequencies(
    table: &FrequencyTable,
    token_count: usize,
    multiplier: i64,
    region: &mut [f32],
) {
    if region.is_empty() || token_count == 0 {
        return;
    }

    let token_count = token_count as f32;
    for (word, count) in table.ranked() {
        let slot = bucket(word, multiplier, region.len());
        region[slot] += count as f32 / token_count;
    }
}

/// Adds the relative position of each of the first `region.len()` tokens into `region`.
pub fn hash_positions(tokens: &[String], multiplier: i64, region: &mut [f32]) {
    if region.is_empty() || tokens.is_empty() {
        return;
    }

    let token_count = tokens.len() as f32;
    let buckets = region.len();
    for (index, token) in tokens.iter().take(buckets).enumerate() {
        let slot = bucket(token, multiplier, buckets);
        region[slot] += index as f32 / token_count;
    }
}
