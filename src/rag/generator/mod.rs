//! Generator module for text generation
//!
//! Provides the trait the pipeline generates through, a model-free extractive
//! backend, and (with the `candle` feature) a Candle decoder backend.

#[cfg(feature = "candle")]
pub mod candle;
pub mod config;
pub mod extractive;

#[cfg(feature = "candle")]
pub use candle::CandleGenerator;
pub use config::{GenerationOptions, GeneratorConfig};
pub use extractive::ExtractiveGenerator;

use anyhow::Result;
use std::sync::Arc;

/// Trait for text generation models
///
/// The returned text conventionally echoes the prompt followed by the
/// completion; the answer extractor relies on that layout.
pub trait Generator: Send + Sync {
    /// Generate text for `prompt`, honouring `options.max_length` as the
    /// budget for prompt plus completion
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Factory function for creating generators
pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn Generator>> {
    match config.backend.as_str() {
        "extractive" => Ok(Arc::new(ExtractiveGenerator::new(config.clone()))),
        #[cfg(feature = "candle")]
        "candle" => Ok(Arc::new(CandleGenerator::new(config.clone())?)),
        #[cfg(not(feature = "candle"))]
        "candle" => {
            anyhow::bail!("Candle backend not enabled. Compile with --features candle");
        }
        other => anyhow::bail!("Unknown generator backend: {}", other),
    }
}
