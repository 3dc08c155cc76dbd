//! Embedding backend implementations
//!
//! Model-free backends (`mock`, `token`) are always available; the Candle BERT
//! backend requires the `candle` feature.

use crate::embedding::{normalize_embedding, Embedder, Embedding, EmbeddingConfig};
use anyhow::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[cfg(feature = "candle")]
pub mod candle_bert;

#[cfg(feature = "candle")]
pub use candle_bert::CandleBertEmbedder;

fn hash_str(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

fn finish(mut embedding: Embedding, config: &EmbeddingConfig) -> Embedding {
    if config.normalize {
        normalize_embedding(&mut embedding);
    }
    embedding
}

/// Deterministic pseudo-random embeddings seeded by the text hash, for tests
pub struct MockEmbedder {
    config: EmbeddingConfig,
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(config: EmbeddingConfig, dimension: usize) -> Self {
        Self { config, dimension }
    }

    fn vector(&self, text: &str) -> Embedding {
        // LCG stream; each step yields one component in [-0.5, 0.5)
        let values = std::iter::successors(Some(hash_str(text)), |state| {
            Some(state.wrapping_mul(1103515245).wrapping_add(12345))
        })
        .skip(1)
        .take(self.dimension)
        .map(|state| ((state >> 16) % 10_000) as f32 / 10_000.0 - 0.5)
        .collect();

        finish(values, &self.config)
    }
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.vector(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// Hashed bag-of-words embedder
///
/// Model-free fallback: each word adds its term frequency to one hashed
/// bucket, so texts sharing (case-insensitive) words get similar vectors. A
/// text with no words embeds to the zero vector.
pub struct TokenEmbedder {
    config: EmbeddingConfig,
    dimension: usize,
}

impl TokenEmbedder {
    pub fn new(config: EmbeddingConfig, dimension: usize) -> Self {
        Self { config, dimension }
    }

    fn vector(&self, text: &str) -> Embedding {
        let mut buckets = vec![0.0; self.dimension];
        let words = tokenize(text);
        if self.dimension == 0 || words.is_empty() {
            return buckets;
        }

        let weight = 1.0 / words.len() as f32;
        for word in &words {
            buckets[(hash_str(word) % self.dimension as u64) as usize] += weight;
        }

        finish(buckets, &self.config)
    }
}

impl Embedder for TokenEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(self.vector(text))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// Split text into lower-cased words on whitespace and ASCII punctuation
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Create an embedder from its configuration
///
/// The returned handle is meant to be built once and shared by every index
/// and pipeline that needs it.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.backend.as_str() {
        "mock" => Ok(Arc::new(MockEmbedder::new(config.clone(), config.dimension))),
        "token" => Ok(Arc::new(TokenEmbedder::new(config.clone(), config.dimension))),
        #[cfg(feature = "candle")]
        "candle" => Ok(Arc::new(CandleBertEmbedder::new(config.clone())?)),
        #[cfg(not(feature = "candle"))]
        "candle" => {
            anyhow::bail!("Candle backend not enabled. Compile with --features candle");
        }
        other => {
            tracing::warn!("Unknown backend '{}', using token-based embedder", other);
            Ok(Arc::new(TokenEmbedder::new(config.clone(), config.dimension)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    #[test]
    fn test_mock_embedder_is_deterministic_per_text() {
        let embedder = MockEmbedder::new(EmbeddingConfig::default(), 128);

        let alaska = embedder.embed("Alaska").unwrap();
        assert_eq!(alaska.len(), 128);
        assert_eq!(alaska, embedder.embed("Alaska").unwrap());
        assert_ne!(alaska, embedder.embed("Florida").unwrap());

        let norm: f32 = alaska.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_token_embedder() {
        let embedder = TokenEmbedder::new(EmbeddingConfig::default(), 256);

        let emb = embedder.embed("The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(emb.len(), 256);

        let similar = embedder.embed("the QUICK brown fox").unwrap();
        let unrelated = embedder.embed("zebra").unwrap();

        assert!(cosine_similarity(&emb, &similar) > cosine_similarity(&emb, &unrelated));
    }

    #[test]
    fn test_token_embedder_empty_text_is_zero() {
        let embedder = TokenEmbedder::new(EmbeddingConfig::default(), 32);
        let emb = embedder.embed(" ?! ").unwrap();
        assert!(emb.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_embedder_batch_preserves_order() {
        let embedder = MockEmbedder::new(EmbeddingConfig::default(), 64);

        let texts = vec!["text1", "text2", "text3"];
        let embeddings = embedder.embed_batch(&texts).unwrap();

        assert_eq!(embeddings.len(), 3);
        assert_eq!(embeddings[1], embedder.embed("text2").unwrap());
    }

    #[test]
    fn test_create_embedder_by_name() {
        let config = EmbeddingConfig {
            backend: "mock".to_string(),
            dimension: 16,
            ..Default::default()
        };
        let embedder = create_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 16);

        let fallback = create_embedder(&EmbeddingConfig {
            backend: "nonexistent".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(fallback.dimension(), 384);
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Which state, is LARGEST?"), vec!["which", "state", "is", "largest"]);
    }
}
