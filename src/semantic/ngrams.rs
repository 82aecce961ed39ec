//! Character n-gram features.

use super::frequency::FrequencyTable;

/// Shortest n-gram length extracted.
pub const MIN_NGRAM: usize = 2;
/// Longest n-gram length extracted.
pub const MAX_NGRAM: usize = 3;

/// Count every overlapping char n-gram of length `min_n..=max_n` in `text`.
pub fn char_ngrams(text: &str, min_n: usize, max_n: usize) -> FrequencyTable {
    let chars: Vec<char> = text.chars().collect();
    let mut table = FrequencyTable::new();

    for n in min_n..=max_n {
        if n == 0 || n > chars.len() {
            continue;
        }
        for window in chars.windows(n) {
            table.add(window.iter().collect::<String>());
        }
    }

    table
}

/// Writes the relative frequency of the top n-grams into `region` in rank order.
///
/// Slot `i` receives `count / text_len` of the `i`-th ranked n-gram. Slots past
/// the number of distinct n-grams stay untouched.
pub fn fill_ngram_features(text: &str, text_len: usize, region: &mut [f32]) {
    if text_len == 0 {
        return;
    }

    let table = char_ngrams(text, MIN_NGRAM, MAX_NGRAM);
    let text_len = text_len as f32;

    for (slot, (_, count)) in region.iter_mut().zip(table.ranked()) {
        *slot = count as f32 / text_len;
    }
}
