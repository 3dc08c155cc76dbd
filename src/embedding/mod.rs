//! Embedding generation
//!
//! Provides the trait-based embedding interface consumed by the corpus index
//! and the retriever, plus vector helpers (normalisation, cosine similarity).
//! Concrete backends live in [`backends`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::DevicePreference;

pub mod backends;

// Re-exports
pub use backends::*;

/// Represents an embedding vector
pub type Embedding = Vec<f32>;

/// Pooling strategy for combining token embeddings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolingStrategy {
    /// Mean pooling across all (unmasked) tokens
    #[default]
    Mean,
    /// Use the CLS token embedding
    Cls,
}

/// Configuration for embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend name: "token", "mock" or "candle"
    pub backend: String,
    /// Model name or path
    pub model_name: String,
    /// Output dimension for the model-free backends (token, mock)
    pub dimension: usize,
    /// Pooling strategy
    pub pooling: PoolingStrategy,
    /// Whether to normalize embeddings
    pub normalize: bool,
    /// Maximum sequence length
    pub max_length: usize,
    /// Batch size for processing
    pub batch_size: usize,
    /// Device preference for model backends
    pub device: DevicePreference,
    /// Directory for downloaded model files (Hub default when unset)
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "token".to_string(),
            model_name: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            pooling: PoolingStrategy::Mean,
            normalize: true,
            max_length: 512,
            batch_size: 32,
            device: DevicePreference::Auto,
            cache_dir: None,
        }
    }
}

/// Trait for embedding models
///
/// `embed_batch` must preserve input order and be deterministic for a given
/// model state. Implementations are shared across pipelines, hence `Send + Sync`.
pub trait Embedder: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed multiple texts in batch
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale `embedding` to unit L2 length; zero vectors are left as they are
pub fn normalize_embedding(embedding: &mut Embedding) {
    let norm = l2_norm(embedding);
    if norm > 0.0 {
        embedding.iter_mut().for_each(|v| *v /= norm);
    }
}

/// Cosine similarity `dot(a, b) / (|a| |b|)`
///
/// Degenerate inputs score 0.0 rather than failing: a zero-norm vector, a
/// dimension mismatch, or non-finite components.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let denom = l2_norm(a) * l2_norm(b);
    if denom == 0.0 {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let sim = dot / denom;
    if sim.is_finite() {
        sim
    } else {
        0.0
    }
}
