//! Configuration for the generation module

use crate::generation::{GenerationError, GenerationResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Configuration for the generation module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// OpenRouter API key
    pub openrouter_api_key: String,
    /// OpenRouter model to use
    pub openrouter_model: String,
    /// OpenRouter API base URL
    pub openrouter_base_url: String,
    /// Whether generation is enabled
    pub enabled: bool,
    /// Timeout for a single completion call in seconds
    pub timeout_seconds: u64,
    /// Maximum rows requested from the model in one batch
    pub batch_size: usize,
    /// Attempts per batch before it is given up
    pub max_batch_attempts: u32,
    /// Row count the model is told to use when a prompt names none
    pub default_row_count: usize,
    /// Upper bound for the row count inferred from a prompt
    pub max_prompt_rows: usize,
    /// Upper bound for user-declared structured generation
    pub max_structured_rows: usize,
    /// Longest dataset text forwarded to analysis flows
    pub max_dataset_chars: usize,
    /// Pause between batch attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Pause after a rate-limited attempt in milliseconds
    pub rate_limit_backoff_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            openrouter_api_key: String::new(),
            openrouter_model: DEFAULT_MODEL.to_string(),
            openrouter_base_url: DEFAULT_BASE_URL.to_string(),
            enabled: false,
            timeout_seconds: 60,
            batch_size: 50,
            max_batch_attempts: 3,
            default_row_count: 15,
            max_prompt_rows: 1_000,
            max_structured_rows: 100,
            max_dataset_chars: 20_000,
            retry_delay_ms: 0,
            rate_limit_backoff_ms: 0,
        }
    }
}

/// Knobs consumed by the generation pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    pub batch_size: usize,
    pub max_batch_attempts: u32,
    pub default_row_count: usize,
    pub max_prompt_rows: usize,
    pub max_structured_rows: usize,
    pub max_dataset_chars: usize,
    pub retry_delay: Duration,
    pub rate_limit_backoff: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationConfig::default().settings()
    }
}

impl GenerationConfig {
    /// Create a new generation config from environment variables and saved config file
    pub fn from_env() -> GenerationResult<Self> {
        let config = Self::from_env_allow_empty();
        if config.openrouter_api_key.is_empty() {
            return Err(GenerationError::configuration_error(
                "SYNTHETIX_OPENROUTER_API_KEY not set in environment or saved config",
            ));
        }
        Ok(config)
    }

    /// Create a new generation config allowing an empty API key (for status endpoints)
    pub fn from_env_allow_empty() -> Self {
        let mut config = Self {
            enabled: true,
            ..Self::default()
        };

        config.openrouter_api_key = env::var("SYNTHETIX_OPENROUTER_API_KEY").unwrap_or_default();
        if let Ok(model) = env::var("OPENROUTER_MODEL") {
            config.openrouter_model = model;
        }

        // If no API key in environment, try to load from saved config
        if config.openrouter_api_key.is_empty() {
            let config_dir =
                env::var("SYNTHETIX_CONFIG_DIR").unwrap_or_else(|_| "./config".to_string());
            if let Ok(saved) = Self::load_saved_config(Path::new(&config_dir)) {
                if !saved.api_key.is_empty() {
                    config.openrouter_api_key = saved.api_key;
                }
                if !saved.model.is_empty() {
                    config.openrouter_model = saved.model;
                }
            }
        }

        if let Ok(base_url) = env::var("OPENROUTER_BASE_URL") {
            config.openrouter_base_url = base_url;
        }

        config.apply_env_vars();
        config
    }

    /// Apply `GENERATION_*` overrides; unparseable values keep the current setting.
    pub fn apply_env_vars(&mut self) {
        fn parse_var<T: std::str::FromStr>(name: &str, current: T) -> T {
            env::var(name)
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(current)
        }

        self.enabled = parse_var("GENERATION_ENABLED", self.enabled);
        self.timeout_seconds = parse_var("GENERATION_TIMEOUT_SECONDS", self.timeout_seconds);
        self.batch_size = parse_var("GENERATION_BATCH_SIZE", self.batch_size);
        self.max_batch_attempts = parse_var("GENERATION_MAX_BATCH_ATTEMPTS", self.max_batch_attempts);
        self.default_row_count = parse_var("GENERATION_DEFAULT_ROW_COUNT", self.default_row_count);
        self.max_prompt_rows = parse_var("GENERATION_MAX_PROMPT_ROWS", self.max_prompt_rows);
        self.max_structured_rows =
            parse_var("GENERATION_MAX_STRUCTURED_ROWS", self.max_structured_rows);
        self.max_dataset_chars = parse_var("GENERATION_MAX_DATASET_CHARS", self.max_dataset_chars);
        self.retry_delay_ms = parse_var("GENERATION_RETRY_DELAY_MS", self.retry_delay_ms);
        self.rate_limit_backoff_ms =
            parse_var("GENERATION_RATE_LIMIT_BACKOFF_MS", self.rate_limit_backoff_ms);
    }

    /// Load saved OpenRouter configuration from `config_dir`
    fn load_saved_config(config_dir: &Path) -> GenerationResult<SavedOpenRouterConfig> {
        let config_path = config_dir.join("openrouter_config.json");
        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            GenerationError::configuration_error(format!(
                "Failed to read {}: {}",
                config_path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            GenerationError::configuration_error(format!(
                "Failed to parse {}: {}",
                config_path.display(),
                e
            ))
        })
    }

    /// Load a full configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> GenerationResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GenerationError::configuration_error(format!("Failed to read config file: {}", e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            GenerationError::configuration_error(format!("Failed to parse config file: {}", e))
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> GenerationResult<()> {
        if self.openrouter_api_key.is_empty() {
            return Err(GenerationError::configuration_error(
                "OpenRouter API key is required",
            ));
        }

        if self.openrouter_model.is_empty() {
            return Err(GenerationError::configuration_error(
                "OpenRouter model is required",
            ));
        }

        if self.openrouter_base_url.is_empty() {
            return Err(GenerationError::configuration_error(
                "OpenRouter base URL is required",
            ));
        }

        self.validate_limits()
    }

    /// Validate the pipeline knobs alone.
    pub fn validate_limits(&self) -> GenerationResult<()> {
        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(GenerationError::configuration_error(
                "Timeout must be between 1 and 300 seconds",
            ));
        }

        if self.batch_size == 0 {
            return Err(GenerationError::configuration_error(
                "Batch size must be greater than 0",
            ));
        }

        if self.max_batch_attempts == 0 || self.max_batch_attempts > 20 {
            return Err(GenerationError::configuration_error(
                "Batch attempts must be between 1 and 20",
            ));
        }

        if self.default_row_count == 0 {
            return Err(GenerationError::configuration_error(
                "Default row count must be greater than 0",
            ));
        }

        if self.max_prompt_rows < self.default_row_count {
            return Err(GenerationError::configuration_error(
                "Max prompt rows must be at least the default row count",
            ));
        }

        Ok(())
    }

    /// Check if generation is enabled and properly configured
    pub fn is_ready(&self) -> bool {
        self.enabled && self.validate().is_ok()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Pipeline knobs derived from this configuration
    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            batch_size: self.batch_size,
            max_batch_attempts: self.max_batch_attempts,
            default_row_count: self.default_row_count,
            max_prompt_rows: self.max_prompt_rows,
            max_structured_rows: self.max_structured_rows,
            max_dataset_chars: self.max_dataset_chars,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            rate_limit_backoff: Duration::from_millis(self.rate_limit_backoff_ms),
        }
    }

    /// API key presence without its value, for status output.
    pub fn api_key_masked(&self) -> &'static str {
        if self.openrouter_api_key.is_empty() {
            "<not configured>"
        } else {
            "***configured***"
        }
    }
}

/// Saved OpenRouter configuration structure
#[derive(Debug, Serialize, Deserialize)]
struct SavedOpenRouterConfig {
    pub api_key: String,
    #[serde(default)]
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GenerationConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.openrouter_model, "anthropic/claude-3.5-sonnet");
        assert_eq!(config.openrouter_base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.max_batch_attempts, 3);
        assert_eq!(config.default_row_count, 15);
        assert_eq!(config.max_dataset_chars, 20_000);
        assert_eq!(config.retry_delay_ms, 0);
    }

    #[test]
    fn test_validation_fails_without_api_key() {
        let config = GenerationConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_succeeds_with_api_key() {
        let config = GenerationConfig {
            openrouter_api_key: "test-key".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_batch_size() {
        let config = GenerationConfig {
            openrouter_api_key: "test-key".to_string(),
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prompt_row_limit_must_cover_default_count() {
        let config = GenerationConfig {
            max_prompt_rows: 10,
            ..Default::default()
        };
        assert!(config.validate_limits().is_err());
        assert_eq!(GenerationConfig::default().settings().max_prompt_rows, 1_000);
    }

    #[test]
    fn test_is_ready() {
        let mut config = GenerationConfig::default();
        assert!(!config.is_ready());

        config.enabled = true;
        config.openrouter_api_key = "test-key".to_string();
        assert!(config.is_ready());
    }

    #[test]
    fn test_settings_mirror_config() {
        let config = GenerationConfig {
            batch_size: 10,
            retry_delay_ms: 250,
            ..Default::default()
        };
        let settings = config.settings();
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.retry_delay, Duration::from_millis(250));
        assert_eq!(settings.max_batch_attempts, 3);
    }

    #[test]
    fn test_load_from_partial_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generation.json");
        std::fs::write(&path, r#"{"openrouter_api_key": "k", "batch_size": 25}"#).unwrap();

        let config = GenerationConfig::load(&path).unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.max_batch_attempts, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_saved_openrouter_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("openrouter_config.json"),
            r#"{"api_key": "saved-key", "model": "openai/gpt-4o"}"#,
        )
        .unwrap();

        let saved = GenerationConfig::load_saved_config(dir.path()).unwrap();
        assert_eq!(saved.api_key, "saved-key");
        assert_eq!(saved.model, "openai/gpt-4o");
    }
}
