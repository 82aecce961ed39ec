//! Statistical embeddings and similarity ranking for stored memories.
//!
//! # Architecture
//!
//! - `normalize`: lowercasing, punctuation stripping, tokenization
//! - `features`, `ngrams`, `hashing`: the four regions of an embedding
//! - `embeddings`: the [`Embedder`] trait and [`StatisticalEmbedder`]
//! - `index`: the [`VectorStore`] boundary and in-memory [`MemoryIndex`]
//! - `ranker`: threshold filtering and favorite boost over store hits

pub mod embeddings;
mod features;
mod frequency;
mod hashing;
mod index;
mod ngrams;
mod normalize;
mod ranker;
mod vector;

pub use embeddings::{Embedder, EmbeddingVector, StatisticalEmbedder};
pub use features::SCALAR_FEATURES;
pub use hashing::DEFAULT_HASH_MULTIPLIER;
pub use index::{IndexError, MemoryIndex, Metadata, StoredRecord, VectorStore};
pub use ranker::{check_params, RankError, RankedResult, SimilarityRanker};
