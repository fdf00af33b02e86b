//! Configuration for sheetqa.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment variables -> CLI overrides.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// LLM provider configuration.
    pub llm: LlmConfig,
    /// Number of rows shown in the dataset preview.
    pub preview_rows: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            preview_rows: 10,
        }
    }
}

/// Configuration for the LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: "gemini" or "mock".
    pub provider: String,
    /// Model identifier. A fast model variant keeps short completions cheap.
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for the API endpoint.
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Temperature for generation. Low, since we want deterministic code.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key_env: "GOOGLE_API_KEY".to_string(),
            base_url: None,
            max_tokens: 256,
            temperature: 0.2,
        }
    }
}

impl AppConfig {
    /// Validate the configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.provider.is_empty() {
            return Err(ConfigError::Invalid {
                message: "llm.provider must not be empty".to_string(),
            });
        }
        if self.llm.model.is_empty() {
            return Err(ConfigError::Invalid {
                message: "llm.model must not be empty".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "llm.temperature must be between 0.0 and 2.0, got {}",
                    self.llm.temperature
                ),
            });
        }
        Ok(())
    }
}

/// Path of the per-user config file, if a home directory can be resolved.
fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "sheetqa", "sheetqa")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration with layered precedence.
///
/// Layers, lowest to highest:
/// 1. Built-in defaults
/// 2. User config file (`~/.config/sheetqa/config.toml` or platform equivalent)
/// 3. Workspace `sheetqa.toml` (or an explicit `--config` path)
/// 4. Environment variables prefixed `SHEETQA_` (nested keys split on `__`)
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    match config_path {
        Some(path) => {
            figment = figment.merge(Toml::file(path));
        }
        None => {
            let ws_config = PathBuf::from("sheetqa.toml");
            if ws_config.exists() {
                figment = figment.merge(Toml::file(&ws_config));
            }
        }
    }

    figment = figment.merge(Env::prefixed("SHEETQA_").split("__"));

    let config: AppConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Resolve the API key for the configured provider from the environment.
///
/// Absence is a fatal startup condition; callers report it and halt before
/// accepting any input.
pub fn resolve_api_key(config: &LlmConfig) -> Result<String, ConfigError> {
    std::env::var(&config.api_key_env).map_err(|_| ConfigError::EnvVarMissing {
        var: config.api_key_env.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "gemini");
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.llm.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.preview_rows, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = AppConfig::default();
        config.llm.model = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = AppConfig::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "sheetqa.toml",
                r#"
                preview_rows = 25

                [llm]
                model = "gemini-1.5-pro"
                "#,
            )?;
            let config = load_config(None).expect("config should load");
            assert_eq!(config.preview_rows, 25);
            assert_eq!(config.llm.model, "gemini-1.5-pro");
            // Untouched keys keep their defaults.
            assert_eq!(config.llm.provider, "gemini");
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_config_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "sheetqa.toml",
                r#"
                [llm]
                model = "gemini-1.5-pro"
                "#,
            )?;
            jail.set_env("SHEETQA_LLM__MODEL", "gemini-2.0-flash");
            let config = load_config(None).expect("config should load");
            assert_eq!(config.llm.model, "gemini-2.0-flash");
            Ok(())
        });
    }

    #[test]
    fn test_resolve_api_key_missing() {
        let mut config = LlmConfig::default();
        config.api_key_env = "SHEETQA_TEST_KEY_THAT_DOES_NOT_EXIST".to_string();
        let err = resolve_api_key(&config).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarMissing { .. }));
    }
}
