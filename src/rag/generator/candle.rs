//! Candle-based decoder model implementation
//!
//! Supports Qwen2 / Qwen2.5 checkpoints via the Candle ML framework.

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::qwen2::{Config as Qwen2Config, ModelForCausalLM as Qwen2Model};
use candle_transformers::utils::apply_repeat_penalty;
use std::sync::Mutex;
use tokenizers::Tokenizer;

use super::{GenerationOptions, Generator, GeneratorConfig};
use crate::models::{select_device, ModelLoader};

/// Tokens considered for the repetition penalty
const REPEAT_LAST_N: usize = 64;

const DEFAULT_SEED: u64 = 42;

/// Candle-based text generator
pub struct CandleGenerator {
    /// KV cache makes forward passes stateful, hence the lock
    model: Mutex<Qwen2Model>,
    tokenizer: Tokenizer,
    config: GeneratorConfig,
    device: Device,
    eos_token_ids: Vec<u32>,
}

impl CandleGenerator {
    /// Load the model named by `config.model_id`
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let device = select_device(config.device)?;

        tracing::info!("Loading generator model: {}", config.model_id);
        tracing::info!("  Device: {:?}", device);
        tracing::info!("  Dtype: {}", config.dtype);

        let loader = ModelLoader::new(config.cache_dir.as_deref())?;
        let files = loader.load(&config.model_id)?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer_file)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;

        let eos_token_ids: Vec<u32> = ["<|endoftext|>", "<|im_end|>"]
            .iter()
            .filter_map(|token| tokenizer.token_to_id(token))
            .collect();
        if eos_token_ids.is_empty() {
            tracing::warn!("No EOS token found in vocabulary; generation stops at max_length only");
        }

        let raw_config: serde_json::Value = files.read_config()?;
        let arch = raw_config["architectures"]
            .get(0)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_lowercase();
        let model_type = raw_config["model_type"].as_str().unwrap_or("").to_lowercase();

        tracing::info!("Detected architecture: {}, model_type: {}", arch, model_type);

        if !(arch.contains("qwen2") || model_type.contains("qwen2")) {
            anyhow::bail!("Unsupported model architecture: {}. Supported: qwen2", arch);
        }

        let qwen_config: Qwen2Config = files.read_config()?;
        tracing::info!(
            "Loading Qwen2: vocab={}, hidden={}, layers={}",
            qwen_config.vocab_size,
            qwen_config.hidden_size,
            qwen_config.num_hidden_layers
        );

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&files.weights_files, parse_dtype(&config.dtype), &device)
                .context("Failed to load model weights")?
        };
        let model = Qwen2Model::new(&qwen_config, vb).context("Failed to create Qwen2 model")?;

        tracing::info!("Generator loaded successfully");

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            config,
            device,
            eos_token_ids,
        })
    }

    fn generate_internal(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let mut tokens = encoding.get_ids().to_vec();
        let prompt_len = tokens.len();

        if prompt_len == 0 {
            anyhow::bail!("Empty prompt after tokenization");
        }

        let max_new_tokens = options.max_length.saturating_sub(prompt_len);
        if max_new_tokens == 0 {
            tracing::warn!(
                "Prompt is {} tokens, at or over max_length {}; nothing generated",
                prompt_len,
                options.max_length
            );
        }

        let mut logits_processor = LogitsProcessor::from_sampling(
            options.seed.unwrap_or(DEFAULT_SEED),
            sampling_for(options),
        );

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow!("Model lock poisoned: {}", e))?;
        model.clear_kv_cache();

        let mut pos = 0;
        for _ in 0..max_new_tokens {
            let context_size = if pos == 0 { tokens.len() } else { 1 };
            let start = tokens.len() - context_size;
            let input = Tensor::new(&tokens[start..], &self.device)?.unsqueeze(0)?;

            let logits = model.forward(&input, pos)?;
            let logits = logits.squeeze(0)?.squeeze(0)?.to_dtype(DType::F32)?;

            let logits = if options.repetition_penalty == 1.0 {
                logits
            } else {
                let recent = &tokens[tokens.len().saturating_sub(REPEAT_LAST_N)..];
                apply_repeat_penalty(&logits, options.repetition_penalty, recent)?
            };

            let next_token = logits_processor.sample(&logits)?;
            tokens.push(next_token);
            pos += context_size;

            if self.eos_token_ids.contains(&next_token) {
                tracing::debug!("Generation stopped: EOS token");
                break;
            }
        }

        let completion = self
            .tokenizer
            .decode(&tokens[prompt_len..], true)
            .map_err(|e| anyhow!("Decoding failed: {}", e))?;

        tracing::debug!("Generated {} tokens", tokens.len() - prompt_len);

        if self.config.return_full_text {
            Ok(format!("{}{}", prompt, completion))
        } else {
            Ok(completion)
        }
    }
}

impl Generator for CandleGenerator {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        options.validate()?;
        self.generate_internal(prompt, options)
    }

    fn model_name(&self) -> &str {
        &self.config.model_id
    }
}

fn parse_dtype(dtype: &str) -> DType {
    match dtype {
        "f16" => DType::F16,
        "bf16" => DType::BF16,
        _ => DType::F32,
    }
}

/// Map generation options to a Candle sampling strategy
fn sampling_for(options: &GenerationOptions) -> Sampling {
    if !options.do_sample || options.temperature <= 0.0 {
        return Sampling::ArgMax;
    }

    let temperature = options.temperature as f64;
    let p = options.top_p as f64;
    match (options.top_k, p < 1.0) {
        (0, false) => Sampling::All { temperature },
        (0, true) => Sampling::TopP { p, temperature },
        (k, false) => Sampling::TopK { k, temperature },
        (k, true) => Sampling::TopKThenTopP { k, p, temperature },
    }
}
