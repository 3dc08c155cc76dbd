//! Two-stage semantic retrieval
//!
//! The corpus index holds topic-level embeddings; the retriever first picks the
//! closest topic, then the closest passage within that topic.

use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod index;
pub mod scoring;
pub mod two_stage;

// Re-exports
pub use index::CorpusIndex;
pub use scoring::{best_match, rank_by_similarity};
pub use two_stage::TopicRetriever;

/// Outcome of a single retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Topic whose embedding best matched the query
    pub best_topic: String,
    /// Best-matching passage among that topic's passages
    pub best_passage: String,
    /// Cosine similarity between query and `best_topic`
    pub topic_score: f32,
    /// Cosine similarity between query and `best_passage`
    pub passage_score: f32,
}

/// Index metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Model name used for embeddings
    pub model_name: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Number of distinct topics
    pub num_topics: usize,
    /// Number of corpus entries (passages)
    pub num_passages: usize,
    /// Index creation timestamp
    pub created_at: String,
}

/// Retrieval tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Reuse passage embeddings of a topic across queries
    pub cache_passage_embeddings: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            cache_passage_embeddings: true,
        }
    }
}

/// Trait for retrieval engines
pub trait Retriever: Send + Sync {
    /// Locate the single best passage for a query
    fn retrieve(&self, query: &str) -> Result<RetrievalResult>;

    /// Get the name of this retriever
    fn name(&self) -> &str;
}
