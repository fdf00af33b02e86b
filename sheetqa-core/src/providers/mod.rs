//! LLM provider abstraction.
//!
//! The pipeline talks to a [`LlmProvider`] trait object so the synthesizer
//! can be exercised in tests without network access. The only production
//! implementation is the native Gemini API client in [`gemini`].

pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Message, TokenUsage};

pub use gemini::GeminiProvider;

/// The interface to a generative text-completion provider.
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the configured model name.
    fn model_name(&self) -> &str;
}

/// Create a provider from configuration, resolving the API key externally.
///
/// The caller resolves the key first so a missing credential is reported as a
/// fatal startup condition before any input is accepted.
pub fn create_provider(
    config: &LlmConfig,
    api_key: String,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new_with_key(config, api_key)?)),
        other => Err(LlmError::UnsupportedProvider {
            provider: other.to_string(),
        }),
    }
}

/// A scriptable provider for tests.
///
/// Returns queued responses in FIFO order; an empty queue yields a fixed
/// placeholder response.
#[derive(Debug)]
pub struct MockLlmProvider {
    model: String,
    responses: std::sync::Mutex<std::collections::VecDeque<CompletionResponse>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: std::sync::Mutex::new(std::collections::VecDeque::new()),
        }
    }

    /// Create a provider that always returns the given text.
    pub fn with_response(text: &str) -> Self {
        let provider = Self::new();
        for _ in 0..20 {
            provider.queue_response(Self::text_response(text));
        }
        provider
    }

    /// Queue a response to be returned by the next `complete` call.
    pub fn queue_response(&self, response: CompletionResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 20,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut responses = self.responses.lock().unwrap();
        match responses.pop_front() {
            Some(response) => Ok(response),
            None => Ok(Self::text_response("df.shape[0]")),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_queued_responses_in_order() {
        let provider = MockLlmProvider::new();
        provider.queue_response(MockLlmProvider::text_response("first"));
        provider.queue_response(MockLlmProvider::text_response("second"));

        let r1 = provider.complete(CompletionRequest::default()).await.unwrap();
        let r2 = provider.complete(CompletionRequest::default()).await.unwrap();
        assert_eq!(r1.message.content, "first");
        assert_eq!(r2.message.content, "second");
    }

    #[tokio::test]
    async fn test_mock_with_response_repeats() {
        let provider = MockLlmProvider::with_response("df['Price'].sum()");
        for _ in 0..3 {
            let r = provider.complete(CompletionRequest::default()).await.unwrap();
            assert_eq!(r.message.content, "df['Price'].sum()");
        }
    }

    #[test]
    fn test_create_provider_rejects_unknown() {
        let mut config = LlmConfig::default();
        config.provider = "oracle".to_string();
        let err = create_provider(&config, "key".into()).unwrap_err();
        assert!(matches!(err, LlmError::UnsupportedProvider { .. }));
    }
}
