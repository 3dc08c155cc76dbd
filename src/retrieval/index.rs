//! Corpus index with topic-level embeddings
//!
//! Owns the flattened corpus and one embedding per distinct topic. Topics keep
//! first-seen order, and row `i` of the topic embedding matrix always belongs to
//! topic `i`. The index is immutable once built.

use anyhow::anyhow;
use std::collections::HashMap;

use crate::data::CorpusEntry;
use crate::embedding::{Embedder, Embedding};
use crate::error::{RagError, Result};
use crate::retrieval::IndexMetadata;

pub struct CorpusIndex {
    /// Corpus in original order
    entries: Vec<CorpusEntry>,
    /// Distinct topics, first-seen order
    topics: Vec<String>,
    /// Topic name to position in `topics`
    topic_ids: HashMap<String, usize>,
    /// Entry positions per topic, corpus order
    topic_entries: Vec<Vec<usize>>,
    /// One row per topic
    topic_embeddings: Vec<Embedding>,
    metadata: IndexMetadata,
}

impl CorpusIndex {
    /// Build the index, embedding every distinct topic in a single batched call
    pub fn build(entries: Vec<CorpusEntry>, embedder: &dyn Embedder) -> Result<Self> {
        if entries.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let mut topics = Vec::new();
        let mut topic_ids = HashMap::new();
        let mut topic_entries: Vec<Vec<usize>> = Vec::new();

        for (pos, entry) in entries.iter().enumerate() {
            let id = *topic_ids.entry(entry.topic.clone()).or_insert_with(|| {
                topics.push(entry.topic.clone());
                topic_entries.push(Vec::new());
                topics.len() - 1
            });
            topic_entries[id].push(pos);
        }

        tracing::debug!(
            "Embedding {} topics for {} passages",
            topics.len(),
            entries.len()
        );

        let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
        let topic_embeddings = embedder
            .embed_batch(&topic_refs)
            .map_err(RagError::Embedding)?;

        let dimension = check_embeddings(&topic_embeddings, topics.len())?;

        let metadata = IndexMetadata {
            model_name: embedder.model_name().to_string(),
            dimension,
            num_topics: topics.len(),
            num_passages: entries.len(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        tracing::info!(
            "Corpus index built: {} topics, {} passages, dim={}",
            metadata.num_topics,
            metadata.num_passages,
            metadata.dimension
        );

        Ok(Self {
            entries,
            topics,
            topic_ids,
            topic_entries,
            topic_embeddings,
            metadata,
        })
    }

    /// Every passage filed under `topic`, in corpus order
    pub fn passages_for_topic(&self, topic: &str) -> Result<Vec<&str>> {
        let id = self
            .topic_id(topic)
            .ok_or_else(|| RagError::UnknownTopic(topic.to_string()))?;
        self.passages_for_topic_id(id)
    }

    /// Passages of the topic at position `id` in topic order
    pub fn passages_for_topic_id(&self, id: usize) -> Result<Vec<&str>> {
        let positions = self
            .topic_entries
            .get(id)
            .ok_or_else(|| RagError::UnknownTopic(format!("#{}", id)))?;

        Ok(positions
            .iter()
            .map(|&pos| self.entries[pos].passage.as_str())
            .collect())
    }

    /// Position of `topic` in topic order
    pub fn topic_id(&self, topic: &str) -> Option<usize> {
        self.topic_ids.get(topic).copied()
    }

    /// Distinct topics in first-seen order
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Topic embedding matrix, rows aligned with `topics()`
    pub fn topic_embeddings(&self) -> &[Embedding] {
        &self.topic_embeddings
    }

    /// The flattened corpus, original order
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn num_topics(&self) -> usize {
        self.topics.len()
    }

    /// Number of corpus entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: an index cannot be built from an empty corpus
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.metadata.dimension
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }
}

/// Check an embedder batch has `expected` rows of one shared dimension; returns it
pub(crate) fn check_embeddings(embeddings: &[Embedding], expected: usize) -> Result<usize> {
    if embeddings.len() != expected {
        return Err(RagError::Embedding(anyhow!(
            "embedder returned {} vectors for {} texts",
            embeddings.len(),
            expected
        )));
    }

    let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
    if let Some(bad) = embeddings.iter().position(|e| e.len() != dimension) {
        return Err(RagError::Embedding(anyhow!(
            "embedding {} has dimension {}, expected {}",
            bad,
            embeddings[bad].len(),
            dimension
        )));
    }

    Ok(dimension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingConfig, MockEmbedder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts batched calls and the texts it was asked to embed
    struct CountingEmbedder {
        inner: MockEmbedder,
        batch_calls: AtomicUsize,
        texts_seen: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: MockEmbedder::new(EmbeddingConfig::default(), 8),
                batch_calls: AtomicUsize::new(0),
                texts_seen: AtomicUsize::new(0),
            }
        }
    }

    impl Embedder for CountingEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Embedding> {
            self.inner.embed(text)
        }

        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Embedding>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
            self.inner.embed_batch(texts)
        }

        fn dimension(&self) -> usize {
            8
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    /// Returns one vector too few
    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn embed(&self, _text: &str) -> anyhow::Result<Embedding> {
            Ok(vec![1.0])
        }

        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Embedding>> {
            Ok(vec![vec![1.0]; texts.len().saturating_sub(1)])
        }

        fn dimension(&self) -> usize {
            1
        }

        fn model_name(&self) -> &str {
            "short"
        }
    }

    fn corpus() -> Vec<CorpusEntry> {
        vec![
            CorpusEntry::new("Florida", "Florida passage one"),
            CorpusEntry::new("Alaska", "Alaska passage one"),
            CorpusEntry::new("Florida", "Florida passage two"),
            CorpusEntry::new("Texas", "Texas passage"),
            CorpusEntry::new("Alaska", "Alaska passage two"),
        ]
    }

    #[test]
    fn test_empty_corpus_fails() {
        let embedder = CountingEmbedder::new();
        let err = CorpusIndex::build(vec![], &embedder).err().unwrap();
        assert!(matches!(err, RagError::EmptyCorpus));
        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_topics_first_seen_order() {
        let embedder = CountingEmbedder::new();
        let index = CorpusIndex::build(corpus(), &embedder).unwrap();

        assert_eq!(index.topics(), &["Florida", "Alaska", "Texas"]);
        assert_eq!(index.num_topics(), 3);
        assert_eq!(index.len(), 5);
        assert_eq!(index.topic_id("Texas"), Some(2));
    }

    #[test]
    fn test_topics_embedded_once_in_one_batch() {
        let embedder = CountingEmbedder::new();
        let index = CorpusIndex::build(corpus(), &embedder).unwrap();

        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.texts_seen.load(Ordering::SeqCst), 3);

        // Row i belongs to topic i
        assert_eq!(index.topic_embeddings().len(), 3);
        for (topic, row) in index.topics().iter().zip(index.topic_embeddings()) {
            assert_eq!(row, &embedder.inner.embed(topic).unwrap());
            assert_eq!(row.len(), index.dimension());
        }
    }

    #[test]
    fn test_passages_for_topic() {
        let embedder = CountingEmbedder::new();
        let index = CorpusIndex::build(corpus(), &embedder).unwrap();

        assert_eq!(
            index.passages_for_topic("Florida").unwrap(),
            vec!["Florida passage one", "Florida passage two"]
        );
        assert_eq!(
            index.passages_for_topic("Alaska").unwrap(),
            vec!["Alaska passage one", "Alaska passage two"]
        );
    }

    #[test]
    fn test_unknown_topic() {
        let embedder = CountingEmbedder::new();
        let index = CorpusIndex::build(corpus(), &embedder).unwrap();

        let err = index.passages_for_topic("Mars").unwrap_err();
        assert!(matches!(err, RagError::UnknownTopic(ref t) if t == "Mars"));
        assert!(index.passages_for_topic_id(7).is_err());
    }

    #[test]
    fn test_metadata() {
        let embedder = CountingEmbedder::new();
        let index = CorpusIndex::build(corpus(), &embedder).unwrap();

        let metadata = index.metadata();
        assert_eq!(metadata.model_name, "counting");
        assert_eq!(metadata.dimension, 8);
        assert_eq!(metadata.num_topics, 3);
        assert_eq!(metadata.num_passages, 5);
    }

    #[test]
    fn test_malformed_embedder_output() {
        let err = CorpusIndex::build(corpus(), &ShortEmbedder).err().unwrap();
        assert!(matches!(err, RagError::Embedding(_)));
    }

    #[test]
    fn test_check_embeddings_dimension_mismatch() {
        let rows = vec![vec![1.0, 0.0], vec![1.0]];
        assert!(check_embeddings(&rows, 2).is_err());
        assert_eq!(check_embeddings(&[vec![1.0, 0.0]], 1).unwrap(), 2);
    }
}
