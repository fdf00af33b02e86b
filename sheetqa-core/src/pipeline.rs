//! The question/answer pipeline.
//!
//! One call to [`QaPipeline::ask`] runs the full cycle: synthesize a
//! candidate expression from the question, sanitize it, parse it into the
//! closed query grammar, and evaluate it against the dataset. Each question
//! either fully succeeds or fully fails; there are no retries and no partial
//! results, and nothing persists between questions.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LlmConfig;
use crate::dataset::Dataset;
use crate::error::SheetQaError;
use crate::providers::LlmProvider;
use crate::query;
use crate::query::Value;
use crate::sanitize::{self, SanitizedExpression};
use crate::synth::QuerySynthesizer;

/// A successful answer, with the intermediate texts kept for display.
#[derive(Debug)]
pub struct Answer {
    /// The raw model output, before sanitization.
    pub raw: String,
    /// The sanitized expression that was evaluated.
    pub expression: String,
    /// The evaluation result.
    pub value: Value,
}

/// A failed question, carrying the expression text for the error display.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct AskError {
    /// The sanitized (or raw, if sanitization was never reached) expression
    /// text, shown alongside the error message.
    pub expression: Option<String>,
    #[source]
    pub source: SheetQaError,
}

/// The pipeline context: holds the synthesizer; the dataset is an explicit
/// argument so a new upload simply swaps the value passed in.
pub struct QaPipeline {
    synthesizer: QuerySynthesizer,
}

impl QaPipeline {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self {
            synthesizer: QuerySynthesizer::new(provider, config.temperature, config.max_tokens),
        }
    }

    /// Answer a question about the dataset.
    pub async fn ask(&self, dataset: &Dataset, question: &str) -> Result<Answer, AskError> {
        let raw = self
            .synthesizer
            .synthesize(dataset.columns(), question)
            .await
            .map_err(|e| AskError {
                expression: None,
                source: e.into(),
            })?;

        let sanitized = sanitize::sanitize(&raw, dataset);
        let expression = sanitized.to_string();
        if sanitized.is_invalid() {
            warn!(raw = raw.as_str(), "Sanitizer rejected synthesized code");
        }

        let value = Self::evaluate(&sanitized, dataset).map_err(|e| AskError {
            expression: Some(expression.clone()),
            source: e,
        })?;

        info!(
            question,
            expression = expression.as_str(),
            "Question answered"
        );
        Ok(Answer {
            raw,
            expression,
            value,
        })
    }

    fn evaluate(
        sanitized: &SanitizedExpression,
        dataset: &Dataset,
    ) -> Result<Value, SheetQaError> {
        let expr = query::parse(sanitized)?;
        let value = query::evaluate(&expr, dataset)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CellValue;
    use crate::providers::MockLlmProvider;

    fn sales_dataset() -> Dataset {
        let columns = vec!["Category".to_string(), "Price".to_string()];
        let rows = vec![
            vec![
                CellValue::Text("Electronics".into()),
                CellValue::Number(599.0),
            ],
            vec![
                CellValue::Text("Electronics".into()),
                CellValue::Number(1299.0),
            ],
            vec![CellValue::Text("Furniture".into()), CellValue::Number(250.0)],
        ];
        Dataset::from_rows(columns, rows).unwrap()
    }

    fn pipeline_with(response: &str) -> QaPipeline {
        let provider = Arc::new(MockLlmProvider::with_response(response));
        QaPipeline::new(provider, &LlmConfig::default())
    }

    #[tokio::test]
    async fn test_ask_passthrough_expression() {
        let pipeline = pipeline_with("df[df['Category']=='Electronics'].shape[0]");
        let ds = sales_dataset();
        let answer = pipeline.ask(&ds, "How many rows are Electronics?").await.unwrap();
        assert_eq!(answer.expression, "df[df['Category']=='Electronics'].shape[0]");
        assert_eq!(answer.value, Value::Count(2));
    }

    #[tokio::test]
    async fn test_ask_unsafe_code_carries_expression_text() {
        let pipeline = pipeline_with("__import__('os').system('rm -rf /')");
        let ds = sales_dataset();
        let err = pipeline.ask(&ds, "bad question").await.unwrap_err();
        assert_eq!(
            err.expression.as_deref(),
            Some("raise ValueError('Invalid or unsafe code generated.')")
        );
        assert_eq!(err.source.to_string(), "Query error: Invalid or unsafe code generated.");
    }
}
