//! Occurrence counting with a deterministic rank order.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Occurrence counts keyed by string (words or n-grams).
///
/// Built and dropped within a single embedding call.
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    counts: HashMap<String, usize>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<S: Into<String>>(&mut self, item: S) {
        *self.counts.entry(item.into()).or_insert(0) += 1;
    }

    /// Number of distinct keys.
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts.values().copied()
    }

    /// Entries sorted by count descending, ties broken by key ascending.
    pub fn ranked(&self) -> Vec<(&str, usize)> {
        let mut entries: Vec<(&str, usize)> = self
            .counts
            .iter()
            .map(|(key, count)| (key.as_str(), *count))
            .collect();

        entries.sort_by(|a, b| match b.1.cmp(&a.1) {
            Ordering::Equal => a.0.cmp(b.0),
            other => other,
        });

        entries
    }
}

impl<S: Into<String>> FromIterator<S> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = S>>(items: I) -> Self {
        let mut table = Self::new();
        for item in items {
            table.add(item);
        }
        table
    }
}
