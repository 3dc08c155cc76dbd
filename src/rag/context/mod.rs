//! Prompt construction for RAG generation
//!
//! Provides the prompt builder and the template it renders.

mod builder;
mod templates;

pub use builder::PromptBuilder;
pub use templates::{PromptTemplate, DEFAULT_TEMPLATE};
