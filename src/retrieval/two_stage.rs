//! Two-stage topic-then-passage retriever
//!
//! Narrowing to one topic before ranking passages bounds passage embedding to
//! the size of that topic instead of the whole corpus. The price is recall:
//! when the topic match is wrong, the globally best passage is never seen.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::embedding::{Embedder, Embedding};
use crate::error::{RagError, Result};
use crate::retrieval::index::check_embeddings;
use crate::retrieval::{
    best_match, rank_by_similarity, CorpusIndex, RetrievalConfig, RetrievalResult, Retriever,
};

/// Dense retriever over a `CorpusIndex`
pub struct TopicRetriever {
    index: Arc<CorpusIndex>,
    embedder: Arc<dyn Embedder>,
    /// Passage embeddings per topic, filled on first use when caching is on
    passage_cache: Option<Vec<OnceCell<Vec<Embedding>>>>,
}

impl TopicRetriever {
    /// Create a retriever with the default configuration
    pub fn new(index: Arc<CorpusIndex>, embedder: Arc<dyn Embedder>) -> Self {
        Self::with_config(index, embedder, &RetrievalConfig::default())
    }

    pub fn with_config(
        index: Arc<CorpusIndex>,
        embedder: Arc<dyn Embedder>,
        config: &RetrievalConfig,
    ) -> Self {
        if embedder.model_name() != index.metadata().model_name {
            tracing::warn!(
                "Embedder model mismatch: index={}, embedder={}",
                index.metadata().model_name,
                embedder.model_name()
            );
        }

        let passage_cache = config
            .cache_passage_embeddings
            .then(|| (0..index.num_topics()).map(|_| OnceCell::new()).collect());

        Self {
            index,
            embedder,
            passage_cache,
        }
    }

    /// The underlying index
    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    /// The `k` closest topics to `query`, best first
    pub fn rank_topics(&self, query: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let query_embedding = self.embed_query(query)?;

        Ok(rank_by_similarity(&query_embedding, self.index.topic_embeddings())
            .into_iter()
            .take(k)
            .map(|(id, score)| (self.index.topics()[id].clone(), score))
            .collect())
    }

    /// Number of topics whose passage embeddings are currently cached
    pub fn cached_topics(&self) -> usize {
        self.passage_cache
            .as_ref()
            .map(|cells| cells.iter().filter(|c| c.get().is_some()).count())
            .unwrap_or(0)
    }

    fn embed_query(&self, query: &str) -> Result<Embedding> {
        self.embedder.embed(query).map_err(RagError::Embedding)
    }

    fn embed_passages(&self, passages: &[&str]) -> Result<Vec<Embedding>> {
        let embeddings = self
            .embedder
            .embed_batch(passages)
            .map_err(RagError::Embedding)?;
        check_embeddings(&embeddings, passages.len())?;
        Ok(embeddings)
    }

    fn rank_passages(
        &self,
        topic_id: usize,
        passages: &[&str],
        query_embedding: &[f32],
    ) -> Result<Option<(usize, f32)>> {
        match &self.passage_cache {
            Some(cells) => {
                let cell = cells
                    .get(topic_id)
                    .ok_or_else(|| RagError::UnknownTopic(format!("#{}", topic_id)))?;
                let embeddings = cell.get_or_try_init(|| self.embed_passages(passages))?;
                Ok(best_match(query_embedding, embeddings))
            }
            None => {
                let embeddings = self.embed_passages(passages)?;
                Ok(best_match(query_embedding, &embeddings))
            }
        }
    }
}

impl Retriever for TopicRetriever {
    fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        let query_embedding = self.embed_query(query)?;

        // Stage 1: topic
        let (topic_id, topic_score) =
            best_match(&query_embedding, self.index.topic_embeddings())
                .ok_or(RagError::EmptyCorpus)?;
        let best_topic = &self.index.topics()[topic_id];

        // Stage 2: passage within the topic
        let passages = self.index.passages_for_topic(best_topic)?;
        let (passage_id, passage_score) = self
            .rank_passages(topic_id, &passages, &query_embedding)?
            .ok_or_else(|| RagError::UnknownTopic(best_topic.clone()))?;

        tracing::debug!(
            "Retrieved topic {:?} (score {:.4}), passage {} of {} (score {:.4})",
            best_topic,
            topic_score,
            passage_id,
            passages.len(),
            passage_score
        );

        Ok(RetrievalResult {
            best_topic: best_topic.clone(),
            best_passage: passages[passage_id].to_string(),
            topic_score,
            passage_score,
        })
    }

    fn name(&self) -> &str {
        "two-stage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CorpusEntry;
    use crate::embedding::{EmbeddingConfig, MockEmbedder, TokenEmbedder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maps texts to fixed vectors by keyword; unknown texts embed to zero
    struct KeywordEmbedder {
        keywords: Vec<(&'static str, Embedding)>,
        batch_calls: AtomicUsize,
    }

    impl KeywordEmbedder {
        fn new(keywords: Vec<(&'static str, Embedding)>) -> Self {
            Self {
                keywords,
                batch_calls: AtomicUsize::new(0),
            }
        }

        fn vector(&self, text: &str) -> Embedding {
            let lower = text.to_lowercase();
            let mut v = vec![0.0; 3];
            for (kw, kv) in &self.keywords {
                if lower.contains(kw) {
                    for (a, b) in v.iter_mut().zip(kv) {
                        *a += b;
                    }
                }
            }
            v
        }
    }

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Embedding> {
            Ok(self.vector(text))
        }

        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Embedding>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| self.vector(t)).collect())
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "keywords"
        }
    }

    fn geography() -> Vec<CorpusEntry> {
        vec![
            CorpusEntry::new("Florida", "Florida is a flowery land of beaches."),
            CorpusEntry::new("Alaska", "Alaska has long winters."),
            CorpusEntry::new("Alaska", "Alaska is the largest state by area."),
            CorpusEntry::new("Texas", "Texas is large too."),
        ]
    }

    fn geography_embedder() -> Arc<KeywordEmbedder> {
        Arc::new(KeywordEmbedder::new(vec![
            ("florida", vec![1.0, 0.0, 0.0]),
            ("flower", vec![1.0, 0.0, 0.0]),
            ("alaska", vec![0.0, 1.0, 0.0]),
            ("largest", vec![0.0, 1.0, 0.0]),
            ("area", vec![0.0, 0.5, 0.0]),
            ("winter", vec![0.0, 0.0, 1.0]),
            ("texas", vec![0.0, 0.0, 1.0]),
        ]))
    }

    fn build(
        entries: Vec<CorpusEntry>,
        embedder: Arc<KeywordEmbedder>,
        config: &RetrievalConfig,
    ) -> TopicRetriever {
        let index = Arc::new(CorpusIndex::build(entries, embedder.as_ref()).unwrap());
        TopicRetriever::with_config(index, embedder, config)
    }

    #[test]
    fn test_two_stage_retrieval() {
        let retriever = build(geography(), geography_embedder(), &RetrievalConfig::default());

        let result = retriever.retrieve("Which state is largest by area?").unwrap();

        assert_eq!(result.best_topic, "Alaska");
        assert_eq!(result.best_passage, "Alaska is the largest state by area.");
        assert!(result.topic_score > 0.99);
        assert!((result.passage_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_best_passage_belongs_to_best_topic() {
        let embedder: Arc<dyn Embedder> =
            Arc::new(TokenEmbedder::new(EmbeddingConfig::default(), 64));
        let entries = vec![
            CorpusEntry::new("Rust", "Rust is a systems programming language."),
            CorpusEntry::new("Python", "Python is popular for data science."),
            CorpusEntry::new("Rust", "Cargo is the Rust package manager."),
            CorpusEntry::new("Python", "Pip installs Python packages."),
        ];
        let index = Arc::new(CorpusIndex::build(entries, embedder.as_ref()).unwrap());
        let retriever = TopicRetriever::new(index.clone(), embedder);

        for query in [
            "rust package manager",
            "data science",
            "installs packages",
            "",
            "completely unrelated words",
        ] {
            let result = retriever.retrieve(query).unwrap();
            let allowed = index.passages_for_topic(&result.best_topic).unwrap();
            assert!(allowed.contains(&result.best_passage.as_str()), "query {:?}", query);
        }
    }

    #[test]
    fn test_retrieval_is_deterministic() {
        let embedder: Arc<dyn Embedder> =
            Arc::new(MockEmbedder::new(EmbeddingConfig::default(), 32));
        let index = Arc::new(CorpusIndex::build(geography(), embedder.as_ref()).unwrap());
        let retriever = TopicRetriever::new(index, embedder);

        let first = retriever.retrieve("Which state is largest by area?").unwrap();
        let second = retriever.retrieve("Which state is largest by area?").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ties_resolve_to_first_topic_and_passage() {
        // Every topic and passage embeds to the same vector
        let embedder = Arc::new(KeywordEmbedder::new(vec![("", vec![1.0, 1.0, 0.0])]));
        let retriever = build(geography(), embedder, &RetrievalConfig::default());

        let result = retriever.retrieve("anything").unwrap();
        assert_eq!(result.best_topic, "Florida");
        assert_eq!(result.best_passage, "Florida is a flowery land of beaches.");
    }

    #[test]
    fn test_zero_query_vector_picks_first() {
        let retriever = build(geography(), geography_embedder(), &RetrievalConfig::default());

        // No keyword matches: the query embeds to the zero vector
        let result = retriever.retrieve("nothing relevant").unwrap();
        assert_eq!(result.best_topic, "Florida");
        assert_eq!(result.best_passage, "Florida is a flowery land of beaches.");
        assert_eq!(result.topic_score, 0.0);
        assert_eq!(result.passage_score, 0.0);
    }

    #[test]
    fn test_wrong_topic_limits_recall() {
        // The topic "Winter" wins on the query, so the better-matching Alaska
        // passage under another topic is never considered.
        let entries = vec![
            CorpusEntry::new("Winter", "Snow falls in Florida rarely."),
            CorpusEntry::new("States", "Alaska winter is long."),
        ];
        let retriever = build(entries, geography_embedder(), &RetrievalConfig::default());

        let result = retriever.retrieve("winter").unwrap();
        assert_eq!(result.best_topic, "Winter");
        assert_eq!(result.best_passage, "Snow falls in Florida rarely.");
    }

    #[test]
    fn test_passage_cache_reuses_embeddings() {
        let embedder = geography_embedder();
        let retriever = build(geography(), embedder.clone(), &RetrievalConfig::default());
        // One batched call for the topics
        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);

        let first = retriever.retrieve("largest state").unwrap();
        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(retriever.cached_topics(), 1);

        let second = retriever.retrieve("largest state").unwrap();
        assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_without_cache_matches_cached_results() {
        let uncached_embedder = geography_embedder();
        let uncached = build(
            geography(),
            uncached_embedder.clone(),
            &RetrievalConfig {
                cache_passage_embeddings: false,
            },
        );
        let cached = build(geography(), geography_embedder(), &RetrievalConfig::default());

        for query in ["largest state", "flowery", "texas winter"] {
            assert_eq!(uncached.retrieve(query).unwrap(), cached.retrieve(query).unwrap());
        }
        // Topics once, then one passage batch per query
        assert_eq!(uncached_embedder.batch_calls.load(Ordering::SeqCst), 4);
        assert_eq!(uncached.cached_topics(), 0);
    }

    #[test]
    fn test_rank_topics() {
        let retriever = build(geography(), geography_embedder(), &RetrievalConfig::default());

        let ranked = retriever.rank_topics("largest", 2).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, "Alaska");
        // Florida and Texas tie at 0.0; Florida comes first
        assert_eq!(ranked[1].0, "Florida");
    }
}
