//! Vector store boundary and an in-memory implementation.
//!
//! The ranker only sees [`VectorStore`]; [`MemoryIndex`] is the store the
//! service runs on, and tests substitute fakes with fixed scores.

use std::collections::HashMap;
use std::sync::RwLock;

use super::vector::cosine_similarity;

/// String metadata attached to each stored entry.
pub type Metadata = HashMap<String, String>;

/// An entry as handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    /// Raw content the embedding was computed from
    pub content: String,
    pub metadata: Metadata,
    pub embedding: Vec<f32>,
}

/// One nearest-neighbor hit.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
    /// Cosine similarity to the probe vector
    pub similarity: f32,
}

/// Errors raised by a vector store.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Backing store unavailable: {0}")]
    Unavailable(String),
}

/// Nearest-neighbor store contract.
///
/// Implementations own their concurrency safety; callers share them behind `Arc`.
pub trait VectorStore: Send + Sync {
    fn dimensions(&self) -> usize;

    /// Insert or replace the entry with `record.id`.
    fn insert(&self, record: StoredRecord) -> Result<(), IndexError>;

    /// Remove an entry. Returns whether it existed.
    fn remove(&self, id: &str) -> Result<bool, IndexError>;

    fn get(&self, id: &str) -> Result<Option<StoredRecord>, IndexError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top `limit` entries by cosine similarity to `vector`, best first.
    fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<QueryResult>, IndexError>;
}

/// In-memory vector store with exhaustive cosine search.
///
/// Entries keep insertion order; a replaced entry keeps its original slot.
/// Equal scores are returned in insertion order, so a zero probe lists
/// everything oldest first.
pub struct MemoryIndex {
    entries: RwLock<Vec<StoredRecord>>,
    dimensions: usize,
}

impl MemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            dimensions,
        }
    }

    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::with_capacity(capacity)),
            dimensions,
        }
    }

    fn check_dimensions(&self, got: usize) -> Result<(), IndexError> {
        if got != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got,
            });
        }
        Ok(())
    }

    fn poisoned<E: std::fmt::Display>(err: E) -> IndexError {
        IndexError::Unavailable(format!("Lock poisoned: {}", err))
    }
}

impl VectorStore for MemoryIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn insert(&self, record: StoredRecord) -> Result<(), IndexError> {
        self.check_dimensions(record.embedding.len())?;

        let mut entries = self.entries.write().map_err(Self::poisoned)?;
        match entries.iter_mut().find(|entry| entry.id == record.id) {
            Some(existing) => *existing = record,
            None => entries.push(record),
        }

        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool, IndexError> {
        let mut entries = self.entries.write().map_err(Self::poisoned)?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        Ok(entries.len() != before)
    }

    fn get(&self, id: &str) -> Result<Option<StoredRecord>, IndexError> {
        let entries = self.entries.read().map_err(Self::poisoned)?;
        Ok(entries.iter().find(|entry| entry.id == id).cloned())
    }

    fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<QueryResult>, IndexError> {
        self.check_dimensions(vector.len())?;

        let entries = self.entries.read().map_err(Self::poisoned)?;

        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, cosine_similarity(vector, &entry.embedding)))
            .collect();

        // stable: ties keep insertion order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(position, similarity)| {
                let entry = &entries[position];
                QueryResult {
                    id: entry.id.clone(),
                    content: entry.content.clone(),
                    metadata: entry.metadata.clone(),
                    similarity,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f32>) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            content: format!("content of {id}"),
            metadata: Metadata::new(),
            embedding,
        }
    }

    #[test]
    fn test_new_index() {
        let index = MemoryIndex::new(384);
        assert_eq!(index.dimensions(), 384);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_get() {
        let index = MemoryIndex::new(3);
        index.insert(record("a", vec![1.0, 0.0, 0.0])).unwrap();

        assert_eq!(index.len(), 1);
        let entry = index.get("a").unwrap().unwrap();
        assert_eq!(entry.embedding, vec![1.0, 0.0, 0.0]);
        assert!(index.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_dimension_mismatch() {
        let index = MemoryIndex::new(3);
        let result = index.insert(record("a", vec![1.0, 0.0, 0.0, 0.0]));
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch { expected: 3, got: 4 })
        ));
    }

    #[test]
    fn test_zero_vector_accepted() {
        let index = MemoryIndex::new(3);
        index.insert(record("empty", vec![0.0, 0.0, 0.0])).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_replace_keeps_slot() {
        let index = MemoryIndex::new(2);
        index.insert(record("a", vec![1.0, 0.0])).unwrap();
        index.insert(record("b", vec![1.0, 0.0])).unwrap();
        index.insert(record("a", vec![1.0, 0.0])).unwrap();

        assert_eq!(index.len(), 2);
        let ids: Vec<String> = index
            .query(&[0.0, 0.0], 10)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_remove() {
        let index = MemoryIndex::new(3);
        index.insert(record("a", vec![1.0, 0.0, 0.0])).unwrap();

        assert!(index.remove("a").unwrap());
        assert!(!index.remove("a").unwrap());
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_orders_by_similarity() {
        let index = MemoryIndex::new(3);
        index.insert(record("x", vec![0.0, 1.0, 0.0])).unwrap();
        index.insert(record("y", vec![1.0, 0.0, 0.0])).unwrap();

        let results = index.query(&[1.0, 0.1, 0.0], 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "y");
        assert!(results[0].similarity > results[1].similarity);
    }

    #[test]
    fn test_query_limit_larger_than_collection() {
        let index = MemoryIndex::new(2);
        for i in 0..3 {
            index.insert(record(&i.to_string(), vec![1.0, i as f32])).unwrap();
        }
        assert_eq!(index.query(&[1.0, 0.0], 1000).unwrap().len(), 3);
        assert_eq!(index.query(&[1.0, 0.0], 2).unwrap().len(), 2);
    }

    #[test]
    fn test_zero_probe_returns_insertion_order() {
        let index = MemoryIndex::new(2);
        for id in ["first", "second", "third"] {
            index.insert(record(id, vec![0.3, 0.7])).unwrap();
        }

        let results = index.query(&[0.0, 0.0], 10).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
        assert!(results.iter().all(|r| r.similarity == 0.0));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = MemoryIndex::new(3);
        assert!(index.query(&[1.0], 5).is_err());
    }
}
