//! RAG (Retrieval-Augmented Generation) Pipeline
//!
//! Answers a question by grounding generation on the single passage the
//! two-stage retriever selects.
//!
//! # Architecture
//!
//! ```text
//! Question
//!     │
//!     ▼
//! ┌─────────────┐
//! │  Retriever  │  ← best topic, then best passage within it
//! └─────────────┘
//!     │
//!     ▼ RetrievalResult
//! ┌─────────────┐
//! │   Prompt    │  ← "Context: ...\n\nQuestion: ...\nAnswer:"
//! │   Builder   │
//! └─────────────┘
//!     │
//!     ▼ Prompt
//! ┌─────────────┐
//! │  Generator  │  ← extractive, or a local LLM (Qwen2) with `candle`
//! └─────────────┘
//!     │
//!     ▼ Raw output
//! ┌─────────────┐
//! │   Answer    │  ← text after the last "Answer: "
//! │  Extractor  │
//! └─────────────┘
//!     │
//!     ▼
//! RagResponse (answer + retrieval + prompt)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use topicrag::rag::{RagPipelineBuilder, GenerationOptions};
//!
//! let pipeline = RagPipelineBuilder::new()
//!     .retriever(retriever)
//!     .generator(generator)
//!     .generation_options(GenerationOptions::greedy())
//!     .build()?;
//!
//! let answer = pipeline.answer("Which state is the largest by area?")?;
//! println!("{}", answer);
//! ```

pub mod answer;
pub mod context;
pub mod generator;
pub mod pipeline;
pub mod query;

// Re-exports for convenience
pub use answer::{AnswerExtractor, ANSWER_MARKER};
pub use context::{PromptBuilder, PromptTemplate, DEFAULT_TEMPLATE};
pub use generator::{
    create_generator, ExtractiveGenerator, GenerationOptions, Generator, GeneratorConfig,
};
pub use pipeline::{PipelineStage, RagPipeline, RagPipelineBuilder};
pub use query::RagResponse;

#[cfg(feature = "candle")]
pub use generator::CandleGenerator;
