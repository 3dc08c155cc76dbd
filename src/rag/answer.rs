//! Answer extraction from raw generator output
//!
//! Generators usually echo the prompt before their completion, so the answer
//! is whatever follows the last answer marker.

/// Marker the default prompt template ends with (plus the separating space)
pub const ANSWER_MARKER: &str = "Answer: ";

/// Isolates the answer span from generated text
#[derive(Debug, Clone)]
pub struct AnswerExtractor {
    marker: String,
}

impl AnswerExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different marker, for custom prompt templates
    pub fn with_marker(marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
        }
    }

    /// Split `raw_output` on the marker and return the last segment
    ///
    /// Without a marker the input is returned unchanged. No trimming is done.
    pub fn extract(&self, raw_output: &str) -> String {
        if self.marker.is_empty() {
            return raw_output.to_string();
        }

        raw_output
            .rsplit(self.marker.as_str())
            .next()
            .unwrap_or(raw_output)
            .to_string()
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for AnswerExtractor {
    fn default() -> Self {
        Self {
            marker: ANSWER_MARKER.to_string(),
        }
    }
}
