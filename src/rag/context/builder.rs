//! Prompt builder for grounded generation
//!
//! Combines the retrieved passage and the user's question into the prompt
//! handed to the generator.

use crate::error::Result;

use super::templates::PromptTemplate;

/// Builds generation prompts from a passage and a question
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    template: PromptTemplate,
}

impl PromptBuilder {
    /// Create a prompt builder with the default template
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a prompt builder with a custom template
    ///
    /// The template must contain `{context}` and `{question}`. Keep the
    /// `Answer:` marker at the end if the default answer extractor is used.
    pub fn with_template(template: &str) -> Result<Self> {
        Ok(Self {
            template: PromptTemplate::parse(template)?,
        })
    }

    /// Format the prompt
    ///
    /// With the default template the result is exactly
    /// `"Context: {passage}\n\nQuestion: {question}\nAnswer:"`.
    pub fn build(&self, passage: &str, question: &str) -> String {
        self.template.render(passage, question)
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }
}
