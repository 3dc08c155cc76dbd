//! Application configuration
//!
//! One TOML file configures the embedder, the generator, generation options and
//! retrieval. Every section is optional and falls back to its defaults.
//!
//! ```toml
//! prompt_template = "Context: {context}\n\nQuestion: {question}\nAnswer:"
//!
//! [embedding]
//! backend = "candle"
//! model_name = "sentence-transformers/all-MiniLM-L6-v2"
//!
//! [generator]
//! backend = "candle"
//! model_id = "Qwen/Qwen2.5-0.5B"
//! cache_dir = "/data/hf-cache"
//!
//! [generation]
//! max_length = 256
//! do_sample = false
//!
//! [retrieval]
//! cache_passage_embeddings = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::embedding::EmbeddingConfig;
use crate::error::{RagError, Result};
use crate::rag::{GenerationOptions, GeneratorConfig, PromptBuilder};
use crate::retrieval::RetrievalConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub embedding: EmbeddingConfig,
    pub generator: GeneratorConfig,
    pub generation: GenerationOptions,
    pub retrieval: RetrievalConfig,
    /// Custom prompt template; the default layout when unset
    pub prompt_template: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RagError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
            .map_err(|e| RagError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| RagError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise only fail at query time
    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(RagError::Config(
                "embedding.dimension must be positive".to_string(),
            ));
        }
        self.generation
            .validate()
            .map_err(|e| RagError::Config(format!("generation: {}", e)))?;
        self.prompt_builder()?;
        Ok(())
    }

    /// Prompt builder for the configured template
    pub fn prompt_builder(&self) -> Result<PromptBuilder> {
        match &self.prompt_template {
            Some(template) => PromptBuilder::with_template(template),
            None => Ok(PromptBuilder::new()),
        }
    }
}
