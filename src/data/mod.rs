//! Corpus data model and loading
//!
//! The retrieval core consumes a flat, ordered list of `(topic, passage)`
//! entries. Loaders in this module turn on-disk datasets (SQuAD-style nested
//! JSON, or JSON Lines records) into that flat form.

use serde::{Deserialize, Serialize};

pub mod loaders;

// Re-exports for convenience
pub use loaders::*;

/// One passage of the corpus together with the topic it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Coarse category (e.g. an article title); repeats across entries
    pub topic: String,
    /// Passage text; need not be unique
    pub passage: String,
}

impl CorpusEntry {
    /// Create a new corpus entry
    pub fn new(topic: impl Into<String>, passage: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            passage: passage.into(),
        }
    }
}

/// SQuAD-style dataset: `data[].title` and `data[].paragraphs[].context`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadDataset {
    pub data: Vec<SquadArticle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadArticle {
    pub title: String,
    #[serde(default)]
    pub paragraphs: Vec<SquadParagraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadParagraph {
    pub context: String,
}

/// Flatten a SQuAD dataset into corpus entries, one per paragraph, in document order
pub fn flatten_squad(dataset: &SquadDataset) -> Vec<CorpusEntry> {
    dataset
        .data
        .iter()
        .flat_map(|article| {
            article
                .paragraphs
                .iter()
                .map(move |p| CorpusEntry::new(article.title.as_str(), p.context.as_str()))
        })
        .collect()
}
