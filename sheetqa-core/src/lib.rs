//! # sheetqa core
//!
//! Core library for sheetqa: load a spreadsheet into an in-memory dataset,
//! synthesize a query expression for a natural-language question via an LLM,
//! sanitize the synthesized text, and evaluate it through a closed query
//! grammar. Presentation lives in the `sheetqa` binary crate.

pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod providers;
pub mod query;
pub mod sanitize;
pub mod synth;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{AppConfig, LlmConfig, load_config, resolve_api_key};
pub use dataset::{CellValue, ColumnType, Dataset};
pub use error::{Result, SheetQaError};
pub use pipeline::{Answer, AskError, QaPipeline};
pub use providers::{GeminiProvider, LlmProvider, MockLlmProvider, create_provider};
pub use query::{QueryExpr, Value};
pub use sanitize::{SanitizedExpression, sanitize};
pub use synth::QuerySynthesizer;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
