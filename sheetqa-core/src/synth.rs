//! Query synthesis: natural-language question -> candidate pandas expression.
//!
//! Builds a fixed instructional prompt embedding the dataset's column names
//! and the verbatim question, then performs exactly one completion call. The
//! raw completion text is returned trimmed; cleanup and validation happen in
//! [`crate::sanitize`].

use std::sync::Arc;
use tracing::debug;

use crate::error::LlmError;
use crate::providers::LlmProvider;
use crate::types::{CompletionRequest, Message};

/// Instruction prefix sent as the system message.
const SYSTEM_INSTRUCTION: &str = "You are a Python data assistant.";

/// Synthesizes a single-line query expression for a question about a dataset.
pub struct QuerySynthesizer {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl QuerySynthesizer {
    pub fn new(provider: Arc<dyn LlmProvider>, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// Build the user prompt for the given columns and question.
    ///
    /// The instructions pin down the two failure modes seen in practice:
    /// models paraphrasing category values instead of matching them exactly,
    /// and models returning prose around the expression.
    fn build_prompt(columns: &[String], question: &str) -> String {
        format!(
            "The user uploaded a spreadsheet with the following columns:\n\
             {columns}\n\
             \n\
             Write a single-line pandas expression using the variable `df` to \
             answer the following question:\n\
             \n\
             \"{question}\"\n\
             \n\
             Important:\n\
             - Treat exact text matches seriously. If a category contains \
             spaces or symbols, use it exactly as-is.\n\
             - Don't split or assume multiple values unless asked.\n\
             \n\
             Only return the code. No explanations or comments.",
            columns = columns.join(", "),
            question = question,
        )
    }

    /// Produce the raw synthesis for a question.
    ///
    /// One outbound call per invocation; no retry, no caching. Provider
    /// failures propagate to the caller.
    pub async fn synthesize(
        &self,
        columns: &[String],
        question: &str,
    ) -> Result<String, LlmError> {
        let prompt = Self::build_prompt(columns, question);
        let request = CompletionRequest {
            messages: vec![Message::system(SYSTEM_INSTRUCTION), Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            model: None,
        };

        let response = self.provider.complete(request).await?;
        let raw = response.message.content.trim().to_string();
        debug!(
            model = response.model.as_str(),
            output_tokens = response.usage.output_tokens,
            raw = raw.as_str(),
            "Synthesized query expression"
        );
        Ok(raw)
    }
}
