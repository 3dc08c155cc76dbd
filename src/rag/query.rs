//! RAG response type
//!
//! Everything one pipeline run produced, for callers who need more than the
//! answer string.

use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievalResult;

/// Response from RAG pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// The question as asked
    pub question: String,
    /// Extracted answer
    pub answer: String,
    /// Topic and passage the answer was grounded on
    pub retrieval: RetrievalResult,
    /// Prompt sent to the generator
    pub prompt: String,
    /// Generator output before extraction
    pub raw_output: String,
    /// Retrieval time in milliseconds
    pub retrieval_time_ms: u64,
    /// Generation time in milliseconds
    pub generation_time_ms: u64,
}

impl RagResponse {
    /// Get total processing time in milliseconds
    pub fn total_time_ms(&self) -> u64 {
        self.retrieval_time_ms + self.generation_time_ms
    }
}

impl std::fmt::Display for RagResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Question: {}", self.question)?;
        writeln!(f, "Answer: {}", self.answer.trim())?;
        writeln!(
            f,
            "\nTopic: {} (score: {:.4})",
            self.retrieval.best_topic, self.retrieval.topic_score
        )?;
        writeln!(
            f,
            "Passage: {} (score: {:.4})",
            truncate_snippet(&self.retrieval.best_passage, 200),
            self.retrieval.passage_score
        )?;
        writeln!(
            f,
            "\nTiming: retrieval={}ms, generation={}ms, total={}ms",
            self.retrieval_time_ms,
            self.generation_time_ms,
            self.total_time_ms()
        )?;
        Ok(())
    }
}

/// Truncate a text snippet to at most `max_chars` characters, preserving word
/// boundaries
pub(crate) fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let cut = match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => return text.to_string(),
    };

    let truncated = &text[..cut];
    match truncated.rfind(' ') {
        Some(last_space) => format!("{}...", &truncated[..last_space]),
        None => format!("{}...", truncated),
    }
}
