//! Extractive generator
//!
//! A model-free backend that answers by copying the context sentence sharing
//! the most words with the question. It follows the same output convention as
//! the decoder backends (prompt echoed, then the completion) so the rest of
//! the pipeline cannot tell the difference.

use anyhow::Result;
use std::collections::HashSet;

use super::{GenerationOptions, Generator, GeneratorConfig};
use crate::embedding::tokenize;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "which", "what", "who", "whom", "how", "why",
    "when", "where", "with", "that", "this", "from", "has", "have", "had", "its", "does", "did",
    "not", "but", "into", "than", "then", "there", "their", "they",
];

/// Generator that extracts its completion from the prompt's context
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    config: GeneratorConfig,
}

impl ExtractiveGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Pick the completion for a prompt, before applying the length budget
    fn complete<'a>(&self, prompt: &'a str) -> Option<&'a str> {
        let (context, question) = split_prompt(prompt);
        let question_terms = content_terms(question);

        let mut best: Option<(&str, usize)> = None;
        for sentence in split_sentences(context) {
            let overlap = content_terms(sentence).intersection(&question_terms).count();
            match best {
                Some((_, best_overlap)) if overlap <= best_overlap => {}
                _ => best = Some((sentence, overlap)),
            }
        }

        best.map(|(sentence, _)| sentence)
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl Generator for ExtractiveGenerator {
    fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        options.validate()?;

        let budget = options
            .max_length
            .saturating_sub(prompt.split_whitespace().count());
        let completion = self
            .complete(prompt)
            .map(|sentence| take_words(sentence, budget))
            .unwrap_or_default();

        tracing::debug!(
            "Extractive completion: {} words (budget {})",
            completion.split_whitespace().count(),
            budget
        );

        Ok(match (self.config.return_full_text, completion.is_empty()) {
            (true, true) => prompt.to_string(),
            (true, false) => format!("{} {}", prompt, completion),
            (false, _) => completion,
        })
    }

    fn model_name(&self) -> &str {
        "extractive"
    }
}

/// Split a prompt into its context and question parts
///
/// The question is taken after the last `Question:` label so a passage
/// mentioning the label does not confuse the split. Without a label the whole
/// prompt is treated as context.
fn split_prompt(prompt: &str) -> (&str, &str) {
    match prompt.rsplit_once("Question:") {
        Some((before, after)) => {
            let context = before.trim();
            let context = context.strip_prefix("Context:").unwrap_or(context).trim();
            let question = after.split("Answer:").next().unwrap_or(after).trim();
            (context, question)
        }
        None => (prompt.trim(), ""),
    }
}

/// Sentences end at `.`, `!` or `?` followed by whitespace or end of text
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                let end = i + c.len_utf8();
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn content_terms(text: &str) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| t.chars().count() >= 3 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

fn take_words(text: &str, limit: usize) -> String {
    text.split_whitespace().take(limit).collect::<Vec<_>>().join(" ")
}
