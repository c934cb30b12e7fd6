//! Runtime configuration.
//!
//! Built once at startup from an optional YAML file and environment
//! overrides, then handed to the controller by value.
//!
//! ```yaml
//! provider: groq
//! provider_options:
//!   base_url: https://api.groq.com/openai/v1
//! completion:
//!   model: llama-3.1-8b-instant
//!   max_tokens: 180
//!   temperature: 0.7
//!   timeout: 15s
//! max_questions: 10
//! feedback_strategy: model
//! catalog: assets/puzzles.yaml
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use situ_core::{Catalog, CatalogError, FeedbackStrategy, DEFAULT_MAX_QUESTIONS};

use crate::providers::CompletionConfig;

pub const ENV_PROVIDER: &str = "SITU_PROVIDER";
pub const ENV_MODEL: &str = "SITU_MODEL";
pub const ENV_TIMEOUT: &str = "SITU_TIMEOUT";
pub const ENV_FEEDBACK_STRATEGY: &str = "SITU_FEEDBACK_STRATEGY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {var}: {message}")]
    InvalidEnv { var: &'static str, message: String },

    #[error("max_questions must be at least 1")]
    ZeroBudget,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Provider type name as registered in the provider registry
    pub provider: String,

    /// Options passed to the provider factory
    pub provider_options: JsonValue,

    pub completion: CompletionConfig,

    /// Questions allowed per puzzle
    pub max_questions: u32,

    pub feedback_strategy: FeedbackStrategy,

    /// Catalog file; the embedded catalog when unset
    pub catalog: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            provider_options: JsonValue::Object(Default::default()),
            completion: CompletionConfig::default(),
            max_questions: DEFAULT_MAX_QUESTIONS,
            feedback_strategy: FeedbackStrategy::default(),
            catalog: None,
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Apply `SITU_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup(ENV_PROVIDER) {
            self.provider = provider;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.completion.model = model;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            self.completion.timeout =
                humantime::parse_duration(&timeout).map_err(|e| ConfigError::InvalidEnv {
                    var: ENV_TIMEOUT,
                    message: e.to_string(),
                })?;
        }
        if let Some(strategy) = lookup(ENV_FEEDBACK_STRATEGY) {
            self.feedback_strategy =
                strategy
                    .parse()
                    .map_err(|message| ConfigError::InvalidEnv {
                        var: ENV_FEEDBACK_STRATEGY,
                        message,
                    })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_questions == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        Ok(())
    }

    /// The configured catalog, or the embedded one.
    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        let catalog = match &self.catalog {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::builtin()?,
        };
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.provider, "groq");
        assert_eq!(config.max_questions, 10);
        assert_eq!(config.feedback_strategy, FeedbackStrategy::Model);
        assert!(config.catalog.is_none());
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = RuntimeConfig::from_yaml(
            r#"
provider: scripted
provider_options:
  replies: ["Yes."]
completion:
  timeout: 3s
feedback_strategy: canned
"#,
        )
        .unwrap();
        assert_eq!(config.provider, "scripted");
        assert_eq!(config.provider_options["replies"][0], "Yes.");
        assert_eq!(config.completion.timeout, Duration::from_secs(3));
        assert_eq!(config.completion.model, "llama-3.1-8b-instant");
        assert_eq!(config.feedback_strategy, FeedbackStrategy::Canned);
    }

    #[test]
    fn test_zero_budget_rejected() {
        assert!(matches!(
            RuntimeConfig::from_yaml("max_questions: 0"),
            Err(ConfigError::ZeroBudget)
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_PROVIDER, "anthropic"),
            (ENV_MODEL, "claude-haiku"),
            (ENV_TIMEOUT, "500ms"),
            (ENV_FEEDBACK_STRATEGY, "canned"),
        ]
        .into_iter()
        .collect();

        let config = RuntimeConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.completion.model, "claude-haiku");
        assert_eq!(config.completion.timeout, Duration::from_millis(500));
        assert_eq!(config.feedback_strategy, FeedbackStrategy::Canned);
    }

    #[test]
    fn test_bad_env_timeout() {
        let result = RuntimeConfig::default().with_overrides(|k| {
            (k == ENV_TIMEOUT).then(|| "soon".to_string())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { var: ENV_TIMEOUT, .. })
        ));
    }

    #[test]
    fn test_builtin_catalog_when_unset() {
        let catalog = RuntimeConfig::default().load_catalog().unwrap();
        assert_eq!(catalog.len(), 3);
    }
}
