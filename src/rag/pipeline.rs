//! RAG Pipeline orchestration
//!
//! Coordinates retrieval, prompting, generation and answer extraction for
//! one question at a time.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{RagError, Result};
use crate::retrieval::Retriever;

use super::answer::AnswerExtractor;
use super::context::PromptBuilder;
use super::generator::{GenerationOptions, Generator};
use super::query::RagResponse;

/// Stage of a pipeline run, recorded in tracing events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Retrieving,
    Prompting,
    Generating,
    Extracting,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Prompting => "prompting",
            PipelineStage::Generating => "generating",
            PipelineStage::Extracting => "extracting",
        };
        f.write_str(name)
    }
}

/// RAG Pipeline for grounded question-answering
///
/// Orchestrates the full RAG workflow:
/// 1. Retrieve the best topic, then the best passage within it
/// 2. Build the prompt from that passage and the question
/// 3. Generate text from the prompt
/// 4. Extract the answer span from the generated text
///
/// Nothing but the shared collaborator handles survives between queries.
pub struct RagPipeline {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    prompt_builder: PromptBuilder,
    extractor: AnswerExtractor,
    options: GenerationOptions,
}

impl RagPipeline {
    /// Create a new pipeline with the default prompt, extractor and options
    /// (use RagPipelineBuilder to customise them)
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            prompt_builder: PromptBuilder::new(),
            extractor: AnswerExtractor::new(),
            options: GenerationOptions::default(),
        }
    }

    /// Answer a question, returning only the extracted answer
    pub fn answer(&self, question: &str) -> Result<String> {
        Ok(self.query(question)?.answer)
    }

    /// Answer a question, returning every intermediate artefact
    pub fn query(&self, question: &str) -> Result<RagResponse> {
        let span = tracing::info_span!("rag_query", retriever = self.retriever.name());
        let _guard = span.enter();

        tracing::debug!(stage = %PipelineStage::Retrieving, "Retrieving for: {}", question);
        let retrieval_start = Instant::now();
        let retrieval = self.retriever.retrieve(question)?;
        let retrieval_time_ms = retrieval_start.elapsed().as_millis() as u64;

        tracing::debug!(
            stage = %PipelineStage::Prompting,
            "Best topic: {} ({:.4}), passage score {:.4}",
            retrieval.best_topic,
            retrieval.topic_score,
            retrieval.passage_score
        );
        let prompt = self.prompt_builder.build(&retrieval.best_passage, question);

        tracing::debug!(
            stage = %PipelineStage::Generating,
            "Generating with {}",
            self.generator.model_name()
        );
        let generation_start = Instant::now();
        let raw_output = self
            .generator
            .generate(&prompt, &self.options)
            .map_err(RagError::Generation)?;
        let generation_time_ms = generation_start.elapsed().as_millis() as u64;

        tracing::debug!(stage = %PipelineStage::Extracting, "Raw output: {} chars", raw_output.len());
        let answer = self.extractor.extract(&raw_output);

        tracing::info!(
            stage = %PipelineStage::Idle,
            "Answered from topic '{}' in {}ms",
            retrieval.best_topic,
            retrieval_time_ms + generation_time_ms
        );

        Ok(RagResponse {
            question: question.to_string(),
            answer,
            retrieval,
            prompt,
            raw_output,
            retrieval_time_ms,
            generation_time_ms,
        })
    }

    /// Get the retriever reference
    pub fn retriever(&self) -> &dyn Retriever {
        self.retriever.as_ref()
    }

    /// Get the generator reference
    pub fn generator(&self) -> &dyn Generator {
        self.generator.as_ref()
    }

    /// Get the generation options
    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }
}

/// Builder for RagPipeline
#[derive(Default)]
pub struct RagPipelineBuilder {
    retriever: Option<Arc<dyn Retriever>>,
    generator: Option<Arc<dyn Generator>>,
    prompt_builder: Option<PromptBuilder>,
    extractor: Option<AnswerExtractor>,
    options: Option<GenerationOptions>,
}

impl RagPipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retriever
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Set the generator
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the generation options
    pub fn generation_options(mut self, options: GenerationOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the prompt builder
    pub fn prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = Some(prompt_builder);
        self
    }

    /// Set the answer extractor
    pub fn extractor(mut self, extractor: AnswerExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<RagPipeline> {
        let retriever = self
            .retriever
            .ok_or_else(|| RagError::Config("Retriever is required to build RagPipeline".into()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::Config("Generator is required to build RagPipeline".into()))?;

        Ok(RagPipeline {
            retriever,
            generator,
            prompt_builder: self.prompt_builder.unwrap_or_default(),
            extractor: self.extractor.unwrap_or_default(),
            options: self.options.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CorpusEntry;
    use crate::embedding::{Embedder, Embedding};
    use crate::rag::generator::ExtractiveGenerator;
    use crate::retrieval::{CorpusIndex, TopicRetriever};
    use std::sync::Mutex;

    /// One axis per keyword; unknown texts embed to zero
    struct KeywordEmbedder;

    const KEYWORDS: [&str; 3] = ["flor", "alask", "largest"];

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Embedding> {
            let lower = text.to_lowercase();
            Ok(KEYWORDS
                .iter()
                .map(|kw| if lower.contains(kw) { 1.0 } else { 0.0 })
                .collect())
        }

        fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Embedding>> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            KEYWORDS.len()
        }

        fn model_name(&self) -> &str {
            "keywords"
        }
    }

    /// Records every prompt and replies with a fixed completion
    struct RecordingGenerator {
        prompts: Mutex<Vec<String>>,
        completion: String,
    }

    impl RecordingGenerator {
        fn new(completion: &str) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                completion: completion.to_string(),
            }
        }
    }

    impl Generator for RecordingGenerator {
        fn generate(&self, prompt: &str, _options: &GenerationOptions) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("{}{}", prompt, self.completion))
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct FailingGenerator;

    impl Generator for FailingGenerator {
        fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> anyhow::Result<String> {
            anyhow::bail!("out of memory")
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    const ALASKA_PASSAGE: &str = "Alaska is the largest state by area.";

    fn retriever() -> Arc<dyn Retriever> {
        let entries = vec![
            CorpusEntry::new("Florida", "Florida has beaches."),
            CorpusEntry::new("Alaska", "Alaska has long winters."),
            CorpusEntry::new("Alaska", ALASKA_PASSAGE),
        ];
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let index = CorpusIndex::build(entries, embedder.as_ref()).unwrap();
        Arc::new(TopicRetriever::new(Arc::new(index), embedder))
    }

    #[test]
    fn test_end_to_end_grounds_on_alaska() {
        let generator = Arc::new(RecordingGenerator::new(" Alaska"));
        let pipeline = RagPipelineBuilder::new()
            .retriever(retriever())
            .generator(generator.clone())
            .build()
            .unwrap();

        let question = "Which state in Alaska's region is the largest?";
        let response = pipeline.query(question).unwrap();

        assert_eq!(response.retrieval.best_topic, "Alaska");
        assert_eq!(response.retrieval.best_passage, ALASKA_PASSAGE);
        assert_eq!(
            response.prompt,
            format!("Context: {}\n\nQuestion: {}\nAnswer:", ALASKA_PASSAGE, question)
        );
        assert_eq!(response.answer, "Alaska");

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(ALASKA_PASSAGE));
    }

    #[test]
    fn test_answer_matches_query() {
        let pipeline = RagPipeline::new(retriever(), Arc::new(RecordingGenerator::new(" Alaska")));
        let question = "Is Alaska the largest?";

        assert_eq!(pipeline.answer(question).unwrap(), pipeline.query(question).unwrap().answer);
    }

    #[test]
    fn test_missing_marker_returns_raw_output() {
        // Completion glued to "Answer:" without the space: no marker match
        let pipeline = RagPipeline::new(retriever(), Arc::new(RecordingGenerator::new("Alaska")));
        let response = pipeline.query("largest state?").unwrap();

        assert_eq!(response.answer, response.raw_output);
        assert!(response.answer.ends_with("Answer:Alaska"));
    }

    #[test]
    fn test_generator_failure_maps_to_generation_error() {
        let pipeline = RagPipeline::new(retriever(), Arc::new(FailingGenerator));

        let err = pipeline.answer("largest state?").unwrap_err();
        assert!(matches!(err, RagError::Generation(_)));
        assert!(err.to_string().contains("out of memory"));
    }

    #[test]
    fn test_invalid_options_surface_as_generation_error() {
        let pipeline = RagPipelineBuilder::new()
            .retriever(retriever())
            .generator(Arc::new(ExtractiveGenerator::default()))
            .generation_options(GenerationOptions::default().with_max_length(0))
            .build()
            .unwrap();

        assert!(matches!(pipeline.answer("largest?"), Err(RagError::Generation(_))));
    }

    #[test]
    fn test_extractive_end_to_end() {
        let pipeline = RagPipelineBuilder::new()
            .retriever(retriever())
            .generator(Arc::new(ExtractiveGenerator::default()))
            .generation_options(GenerationOptions::greedy())
            .build()
            .unwrap();

        let answer = pipeline.answer("Is Alaska the largest state by area?").unwrap();
        assert_eq!(answer, ALASKA_PASSAGE);
    }

    #[test]
    fn test_builder_requires_parts() {
        let err = RagPipelineBuilder::new().build().err().unwrap();
        assert!(matches!(err, RagError::Config(_)));

        let err = RagPipelineBuilder::new()
            .retriever(retriever())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::Retrieving.to_string(), "retrieving");
        assert_eq!(PipelineStage::Idle.to_string(), "idle");
    }
}
