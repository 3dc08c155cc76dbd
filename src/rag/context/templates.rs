//! Prompt templates
//!
//! A template is text with `{context}` and `{question}` placeholders. Rendering
//! is single-pass: placeholder-looking text inside the substituted passage or
//! question is copied verbatim, never expanded again.

use crate::error::{RagError, Result};

/// The prompt layout the answer extractor relies on
pub const DEFAULT_TEMPLATE: &str = "Context: {context}\n\nQuestion: {question}\nAnswer:";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Context,
    Question,
}

/// A parsed prompt template
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse a template; both placeholders must be present
    pub fn parse(template: &str) -> Result<Self> {
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(RagError::InvalidTemplate(format!(
                    "missing {} placeholder",
                    placeholder
                )));
            }
        }

        Ok(Self {
            source: template.to_string(),
            segments: split_segments(template),
        })
    }

    /// Substitute the passage and question in one pass
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + context.len() + question.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Context => out.push_str(context),
                Segment::Question => out.push_str(question),
            }
        }
        out
    }

    /// The template text as given
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            segments: split_segments(DEFAULT_TEMPLATE),
        }
    }
}

fn split_segments(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = template;

    loop {
        let next = [
            (rest.find(CONTEXT_PLACEHOLDER), CONTEXT_PLACEHOLDER, Segment::Context),
            (rest.find(QUESTION_PLACEHOLDER), QUESTION_PLACEHOLDER, Segment::Question),
        ]
        .into_iter()
        .filter_map(|(pos, text, seg)| pos.map(|p| (p, text, seg)))
        .min_by_key(|(pos, _, _)| *pos);

        match next {
            Some((pos, placeholder, segment)) => {
                if pos > 0 {
                    segments.push(Segment::Literal(rest[..pos].to_string()));
                }
                segments.push(segment);
                rest = &rest[pos + placeholder.len()..];
            }
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Literal(rest.to_string()));
                }
                return segments;
            }
        }
    }
}
