//! Candle-based BERT sentence embedder
//!
//! Loads a sentence-transformers style BERT encoder (e.g.
//! `sentence-transformers/all-MiniLM-L6-v2`) and pools token states into one
//! vector per text.

use anyhow::{anyhow, Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

use crate::embedding::{Embedder, Embedding, EmbeddingConfig, PoolingStrategy};
use crate::models::{select_device, ModelLoader};

/// Candle BERT embedder implementing the `Embedder` trait
pub struct CandleBertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    config: EmbeddingConfig,
    device: Device,
    hidden_size: usize,
}

impl CandleBertEmbedder {
    /// Load the encoder named by `config.model_name`
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let device = select_device(config.device)?;

        tracing::info!("Loading Candle BERT embedder: {}", config.model_name);
        tracing::info!("  Device: {:?}", device);
        tracing::info!("  Pooling: {:?}, normalize: {}", config.pooling, config.normalize);

        let loader = ModelLoader::new(config.cache_dir.as_deref())?;
        let files = loader.load(&config.model_name)?;

        let bert_config: BertConfig = files.read_config()?;
        let raw_config: serde_json::Value = files.read_config()?;
        let hidden_size = raw_config["hidden_size"]
            .as_u64()
            .ok_or_else(|| anyhow!("Config missing required field: hidden_size"))?
            as usize;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer_file)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to set truncation: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&files.weights_files, DTYPE, &device)
                .context("Failed to load model weights")?
        };
        let model = BertModel::load(vb, &bert_config).context("Failed to create BERT model")?;

        tracing::info!("Candle BERT embedder loaded (dim={})", hidden_size);

        Ok(Self {
            model,
            tokenizer,
            config,
            device,
            hidden_size,
        })
    }

    /// Embed one tokenizer batch, returning a `[batch, hidden]` tensor
    fn embed_batch_tensor(&self, texts: &[&str]) -> Result<Tensor> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("Batch tokenization failed: {}", e))?;

        let ids = encodings
            .iter()
            .map(|e| Tensor::new(e.get_ids(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let masks = encodings
            .iter()
            .map(|e| Tensor::new(e.get_attention_mask(), &self.device))
            .collect::<candle_core::Result<Vec<_>>>()?;

        let input_ids = Tensor::stack(&ids, 0)?;
        let attention_mask = Tensor::stack(&masks, 0)?;
        let token_type_ids = input_ids.zeros_like()?;

        // [batch, seq_len, hidden]
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled = match self.config.pooling {
            PoolingStrategy::Mean => {
                let mask = attention_mask.to_dtype(DTYPE)?.unsqueeze(2)?;
                let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
                let counts = mask.sum(1)?;
                summed.broadcast_div(&counts)?
            }
            PoolingStrategy::Cls => hidden.narrow(1, 0, 1)?.squeeze(1)?,
        };

        if self.config.normalize {
            let norms = pooled.sqr()?.sum_keepdim(1)?.sqrt()?;
            Ok(pooled.broadcast_div(&norms)?)
        } else {
            Ok(pooled)
        }
    }
}

impl Embedder for CandleBertEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut batch = self.embed_batch(&[text])?;
        batch
            .pop()
            .ok_or_else(|| anyhow!("Embedder returned no vector"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            let batch_tensor = self.embed_batch_tensor(chunk)?;
            all_embeddings.extend(batch_tensor.to_vec2::<f32>()?);
        }

        Ok(all_embeddings)
    }

    fn dimension(&self) -> usize {
        self.hidden_size
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}
