//! Command-line interface
//!
//! Provides CLI commands for listing topics, running retrieval and answering
//! questions over a corpus file.

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::data::MultiFormatLoader;
use crate::embedding::create_embedder;
use crate::models::DevicePreference;
use crate::rag::{create_generator, RagPipelineBuilder};
use crate::retrieval::{CorpusIndex, Retriever, TopicRetriever};

/// Command-line values that take precedence over the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Embedding backend: token, mock, or candle
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Embedding model name or path
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Generator backend: extractive or candle
    #[arg(long, global = true)]
    pub generator: Option<String>,

    /// Generator model ID or path
    #[arg(long, global = true)]
    pub generator_model: Option<String>,

    /// Device: auto, cpu, cuda, or metal (both models)
    #[arg(long, global = true)]
    pub device: Option<String>,

    /// Maximum length of prompt plus completion
    #[arg(long, global = true)]
    pub max_length: Option<usize>,

    /// Sampling temperature
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Nucleus sampling threshold
    #[arg(long, global = true)]
    pub top_p: Option<f32>,

    /// Top-k sampling pool (0 disables)
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// Sample instead of greedy decoding
    #[arg(long, global = true)]
    pub do_sample: Option<bool>,

    /// Random seed for sampling
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

/// Load the config file (defaults when absent) and apply CLI overrides
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => {
            tracing::info!("Loading config: {:?}", path);
            AppConfig::from_file(path)?
        }
        None => AppConfig::default(),
    };

    apply_overrides(&mut config, overrides)?;
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, overrides: &ConfigOverrides) -> Result<()> {
    if let Some(backend) = &overrides.backend {
        config.embedding.backend = backend.clone();
    }
    if let Some(model) = &overrides.model {
        config.embedding.model_name = model.clone();
    }
    if let Some(generator) = &overrides.generator {
        config.generator.backend = generator.clone();
    }
    if let Some(model) = &overrides.generator_model {
        config.generator.model_id = model.clone();
    }
    if let Some(device) = &overrides.device {
        let device: DevicePreference = device.parse()?;
        config.embedding.device = device;
        config.generator.device = device;
    }

    let generation = &mut config.generation;
    if let Some(max_length) = overrides.max_length {
        generation.max_length = max_length;
    }
    if let Some(temperature) = overrides.temperature {
        generation.temperature = temperature;
    }
    if let Some(top_p) = overrides.top_p {
        generation.top_p = top_p;
    }
    if let Some(top_k) = overrides.top_k {
        generation.top_k = top_k;
    }
    if let Some(do_sample) = overrides.do_sample {
        generation.do_sample = do_sample;
    }
    if let Some(seed) = overrides.seed {
        generation.seed = Some(seed);
    }

    Ok(())
}

/// Load the corpus and build the retriever over it
fn build_retriever(config: &AppConfig, corpus: &Path) -> Result<TopicRetriever> {
    let entries = MultiFormatLoader::new()
        .load(corpus)
        .with_context(|| format!("Failed to load corpus: {:?}", corpus))?;
    tracing::info!("Loaded {} corpus entries from {:?}", entries.len(), corpus);

    let embedder = create_embedder(&config.embedding)?;
    tracing::info!(
        "Embedder: {} (dim {})",
        embedder.model_name(),
        embedder.dimension()
    );

    let index = CorpusIndex::build(entries, embedder.as_ref())?;
    tracing::info!(
        "Indexed {} passages under {} topics",
        index.len(),
        index.num_topics()
    );

    Ok(TopicRetriever::with_config(
        Arc::new(index),
        embedder,
        &config.retrieval,
    ))
}

/// Execute the topics command
pub fn topics(config: &AppConfig, corpus: &Path) -> Result<()> {
    let retriever = build_retriever(config, corpus)?;
    let index = retriever.index();

    println!("\nTopics ({}):", index.num_topics());
    for (id, topic) in index.topics().iter().enumerate() {
        let passages = index.passages_for_topic_id(id)?;
        println!("  [{}] {} ({} passages)", id + 1, topic, passages.len());
    }

    let metadata = index.metadata();
    println!(
        "\nIndex: {} passages, model {} (dim {}), built {}",
        metadata.num_passages, metadata.model_name, metadata.dimension, metadata.created_at
    );

    Ok(())
}

/// Execute the retrieve command
pub fn retrieve(config: &AppConfig, corpus: &Path, query: &str, top_topics: usize) -> Result<()> {
    tracing::info!("Running retrieval");
    tracing::info!("  Query: {}", query);

    let retriever = build_retriever(config, corpus)?;
    let result = retriever.retrieve(query)?;

    println!("\nQuery: {}", query);
    println!("Best topic: {} (score: {:.4})", result.best_topic, result.topic_score);
    println!("Best passage (score: {:.4}):", result.passage_score);
    println!("  {}", result.best_passage);

    if top_topics > 0 {
        println!("\nTop {} topics:", top_topics);
        for (rank, (topic, score)) in retriever.rank_topics(query, top_topics)?.iter().enumerate() {
            println!("  {}. {} (score: {:.4})", rank + 1, topic, score);
        }
    }

    Ok(())
}

/// Execute the ask command
pub fn ask(config: &AppConfig, corpus: &Path, questions: &[String], show_prompt: bool) -> Result<()> {
    if questions.is_empty() {
        anyhow::bail!("At least one --question is required");
    }

    let retriever = build_retriever(config, corpus)?;
    let generator = create_generator(&config.generator)?;
    tracing::info!("Generator: {}", generator.model_name());

    let pipeline = RagPipelineBuilder::new()
        .retriever(Arc::new(retriever))
        .generator(generator)
        .generation_options(config.generation.clone())
        .prompt_builder(config.prompt_builder()?)
        .build()?;

    for question in questions {
        let response = pipeline.query(question)?;

        if show_prompt {
            println!("\n--- Prompt ---\n{}\n--------------", response.prompt);
        }
        println!("\n{}", response);
    }

    Ok(())
}
