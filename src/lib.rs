//! # topicrag
//!
//! Topic-narrowed retrieval-augmented question answering.
//!
//! ## Overview
//!
//! A corpus of `(topic, passage)` entries is indexed by topic. A question is
//! answered in two retrieval stages (best topic, then best passage within that
//! topic) followed by grounded generation on the single selected passage.
//!
//! ## Architecture
//!
//! - `data` - Corpus entries and loaders (SQuAD-style JSON, JSONL records)
//! - `embedding` - Embedder trait, cosine similarity, and backends
//! - `retrieval` - Corpus index and the two-stage retriever
//! - `rag` - Prompt building, generation, answer extraction, pipeline
//! - `models` - Device selection and model file resolution for Candle backends
//! - `config` - TOML application configuration
//! - `cli` - Command-line interface
//!
//! Enable the `candle` feature for the BERT embedder and Qwen2 generator
//! (`cuda` / `metal` for GPU acceleration).

pub mod cli;
pub mod config;
pub mod data;
pub mod embedding;
pub mod error;
pub mod models;
pub mod rag;
pub mod retrieval;

// Re-export commonly used types
pub use error::{RagError, Result};
