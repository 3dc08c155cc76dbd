//! HuggingFace Hub integration for model downloading
//!
//! Resolves a model identifier to local files, either from a local directory or
//! by downloading from the Hub. The download cache directory is explicit
//! configuration handed to the Hub client.

use anyhow::{anyhow, Context, Result};
use hf_hub::api::sync::{Api, ApiBuilder, ApiRepo};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Local files making up a pretrained model
#[derive(Debug, Clone)]
pub struct ModelFiles {
    /// Original model ID or local path
    pub model_id: String,
    /// Path to config.json
    pub config_file: PathBuf,
    /// Safetensors weight files (one, or several shards)
    pub weights_files: Vec<PathBuf>,
    /// Path to tokenizer.json
    pub tokenizer_file: PathBuf,
}

impl ModelFiles {
    /// Resolve model files from a local directory
    pub fn from_local(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(anyhow!("Model directory does not exist: {:?}", path));
        }

        let config_file = path.join("config.json");
        if !config_file.exists() {
            return Err(anyhow!("config.json not found in {:?}", path));
        }

        let tokenizer_file = path.join("tokenizer.json");
        if !tokenizer_file.exists() {
            return Err(anyhow!("tokenizer.json not found in {:?}", path));
        }

        let single = path.join("model.safetensors");
        let weights_files = if single.exists() {
            vec![single]
        } else {
            let index = path.join("model.safetensors.index.json");
            if !index.exists() {
                return Err(anyhow!(
                    "No model weights found in {:?} (tried model.safetensors and model.safetensors.index.json)",
                    path
                ));
            }
            shard_names(&index)?
                .into_iter()
                .map(|name| path.join(name))
                .collect()
        };

        Ok(Self {
            model_id: path.to_string_lossy().to_string(),
            config_file,
            weights_files,
            tokenizer_file,
        })
    }

    /// Read and parse config.json
    pub fn read_config<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let content = std::fs::read_to_string(&self.config_file)
            .with_context(|| format!("Failed to read config file: {:?}", self.config_file))?;
        serde_json::from_str(&content).context("Failed to parse config.json")
    }
}

/// Model loader that handles both local and Hub models
pub struct ModelLoader {
    api: Api,
}

impl ModelLoader {
    /// Create a loader; `cache_dir` overrides the Hub's default cache location
    pub fn new(cache_dir: Option<&Path>) -> Result<Self> {
        let mut builder = ApiBuilder::new();
        if let Some(dir) = cache_dir {
            builder = builder.with_cache_dir(dir.to_path_buf());
        }
        let api = builder
            .build()
            .context("Failed to initialize HuggingFace Hub API")?;
        Ok(Self { api })
    }

    /// Resolve model files, treating existing paths as local models
    pub fn load(&self, model_id_or_path: &str) -> Result<ModelFiles> {
        let local_path = Path::new(model_id_or_path);
        let looks_local = model_id_or_path.starts_with('.')
            || model_id_or_path.starts_with('/')
            || model_id_or_path.starts_with('~');

        if local_path.exists() {
            tracing::info!("Loading model from local path: {}", model_id_or_path);
            ModelFiles::from_local(local_path)
        } else if looks_local {
            Err(anyhow!("Local model path does not exist: {}", model_id_or_path))
        } else {
            tracing::info!("Fetching model from HuggingFace Hub: {}", model_id_or_path);
            self.download(model_id_or_path)
        }
    }

    fn download(&self, model_id: &str) -> Result<ModelFiles> {
        let repo = self.api.model(model_id.to_string());

        let config_file = repo
            .get("config.json")
            .context("Failed to download config.json")?;
        let tokenizer_file = repo
            .get("tokenizer.json")
            .context("Failed to download tokenizer.json")?;

        let weights_files = match repo.get("model.safetensors") {
            Ok(path) => vec![path],
            Err(_) => download_shards(&repo)?,
        };

        tracing::debug!("Model files ready: {} weight file(s)", weights_files.len());

        Ok(ModelFiles {
            model_id: model_id.to_string(),
            config_file,
            weights_files,
            tokenizer_file,
        })
    }
}

fn download_shards(repo: &ApiRepo) -> Result<Vec<PathBuf>> {
    let index = repo
        .get("model.safetensors.index.json")
        .context("No model weights found (tried model.safetensors and sharded safetensors)")?;

    shard_names(&index)?
        .iter()
        .map(|name| {
            repo.get(name)
                .with_context(|| format!("Failed to download weight shard {}", name))
        })
        .collect()
}

/// Distinct shard file names listed in a safetensors index, sorted
fn shard_names(index_file: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(index_file)
        .with_context(|| format!("Failed to read {:?}", index_file))?;
    let index: serde_json::Value = serde_json::from_str(&content)?;

    let weight_map = index
        .get("weight_map")
        .and_then(|v| v.as_object())
        .ok_or_else(|| anyhow!("weight_map missing in {:?}", index_file))?;

    let names: BTreeSet<String> = weight_map
        .values()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    Ok(names.into_iter().collect())
}
