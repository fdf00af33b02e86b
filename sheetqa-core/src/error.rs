//! Error types for the sheetqa core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering LLM, dataset loading, query evaluation, and configuration domains.

use std::path::PathBuf;

/// Message carried by queries rejected during sanitization.
///
/// The sanitizer never fails at sanitization time; it defers the signal to
/// evaluation, where it surfaces as a [`QueryError::InvalidCode`] with this
/// exact text.
pub const INVALID_CODE_MESSAGE: &str = "Invalid or unsafe code generated.";

/// Top-level error type for the sheetqa core library.
#[derive(Debug, thiserror::Error)]
pub enum SheetQaError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Dataset error: {0}")]
    Data(#[from] DataError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },
}

/// Errors from loading a spreadsheet into a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Failed to open {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("File contains no sheets")]
    NoSheets,

    #[error("Sheet has no header row")]
    MissingHeader,

    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Errors from parsing or evaluating a sanitized query expression.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The deliberate error for expressions rejected by the sanitizer.
    #[error("{INVALID_CODE_MESSAGE}")]
    InvalidCode,

    #[error("Unsupported expression: {text}")]
    Unsupported { text: String },

    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("Cannot apply {operation} to non-numeric column '{column}'")]
    TypeMismatch { operation: String, column: String },

    #[error("Cannot compare column '{column}' with {literal}")]
    BadComparison { column: String, literal: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `SheetQaError`.
pub type Result<T> = std::result::Result<T, SheetQaError>;
