//! Error taxonomy for the retrieval/generation core
//!
//! Collaborator traits (`Embedder`, `Generator`) report failures as
//! `anyhow::Error`; the core wraps them into `RagError` so callers can tell
//! which stage failed.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    /// The corpus handed to `CorpusIndex::build` had no entries
    #[error("cannot build a corpus index from an empty corpus")]
    EmptyCorpus,

    /// A topic lookup missed the topic set (index consistency violation)
    #[error("unknown topic: {0:?}")]
    UnknownTopic(String),

    /// The embedding provider failed or returned malformed vectors
    #[error("embedding failed: {0:#}")]
    Embedding(#[source] anyhow::Error),

    /// The text generator failed; never retried by the pipeline
    #[error("generation failed: {0:#}")]
    Generation(#[source] anyhow::Error),

    #[error("invalid prompt template: {0}")]
    InvalidTemplate(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RagError>;
