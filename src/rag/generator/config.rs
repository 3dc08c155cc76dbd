//! Configuration for text generators
//!
//! `GeneratorConfig` describes which model to load and where; it is handed to
//! the generator constructor once. `GenerationOptions` controls a single
//! generation call.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::DevicePreference;

/// Configuration for initializing a generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Backend name: "extractive" or "candle"
    pub backend: String,

    /// HuggingFace model ID or local path
    pub model_id: String,

    /// Device preference (auto, cuda, metal, cpu)
    pub device: DevicePreference,

    /// Model data type ("f32", "f16", "bf16")
    pub dtype: String,

    /// Directory for downloaded model files (Hub default when unset)
    pub cache_dir: Option<PathBuf>,

    /// Echo the prompt in front of the completion
    pub return_full_text: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: "extractive".to_string(),
            model_id: "Qwen/Qwen2.5-0.5B".to_string(),
            device: DevicePreference::Auto,
            dtype: "f32".to_string(),
            cache_dir: None,
            return_full_text: true,
        }
    }
}

impl GeneratorConfig {
    /// Create a new generator config with the given model ID
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            ..Default::default()
        }
    }

    /// Set the backend
    pub fn with_backend(mut self, backend: &str) -> Self {
        self.backend = backend.to_string();
        self
    }

    /// Set the device preference
    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }

    /// Set the data type
    pub fn with_dtype(mut self, dtype: &str) -> Self {
        self.dtype = dtype.to_string();
        self
    }

    /// Set the download cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Set whether the prompt is echoed in the output
    pub fn with_return_full_text(mut self, enable: bool) -> Self {
        self.return_full_text = enable;
        self
    }
}

/// Options for one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Maximum total length (prompt plus completion) in tokens
    pub max_length: usize,

    /// Sampling temperature; 0.0 means greedy argmax
    pub temperature: f32,

    /// Nucleus sampling threshold in (0, 1]
    pub top_p: f32,

    /// Candidate pool size (0 = disabled)
    pub top_k: usize,

    /// Stochastic sampling when true, greedy decoding when false
    pub do_sample: bool,

    /// Repetition penalty (1.0 = no penalty)
    pub repetition_penalty: f32,

    /// Random seed for reproducible sampling
    pub seed: Option<u64>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_length: 512,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 50,
            do_sample: true,
            repetition_penalty: 1.1,
            seed: None,
        }
    }
}

impl GenerationOptions {
    /// Deterministic greedy decoding
    pub fn greedy() -> Self {
        Self {
            temperature: 0.0,
            top_p: 1.0,
            top_k: 1,
            do_sample: false,
            repetition_penalty: 1.0,
            ..Default::default()
        }
    }

    /// More random sampling
    pub fn creative() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 0,
            do_sample: true,
            repetition_penalty: 1.2,
            ..Default::default()
        }
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_do_sample(mut self, do_sample: bool) -> Self {
        self.do_sample = do_sample;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Reject option combinations no generator can honour
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            anyhow::bail!("max_length must be positive");
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            anyhow::bail!("temperature must be a non-negative number, got {}", self.temperature);
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            anyhow::bail!("top_p must be in (0, 1], got {}", self.top_p);
        }
        if !(self.repetition_penalty.is_finite() && self.repetition_penalty > 0.0) {
            anyhow::bail!(
                "repetition_penalty must be positive, got {}",
                self.repetition_penalty
            );
        }
        Ok(())
    }
}
