//! # Logging System
//!
//! Configuration and feature-level filtering on top of [`crate::web_logger`].

pub mod config;
pub mod features;
pub mod routes;

use config::LogConfig;
use features::LogFeature;
use log::LevelFilter;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Global logging configuration instance
static LOGGING_CONFIG: OnceCell<Arc<RwLock<LogConfig>>> = OnceCell::new();

pub struct LoggingSystem;

impl LoggingSystem {
    /// Initialize with defaults plus environment overrides
    pub async fn init_default() -> Result<(), LoggingError> {
        let config = LogConfig::from_env()?;
        Self::init_with_config(config).await
    }

    /// Initialize from a TOML file, falling back to defaults when it is absent
    pub async fn init_from_file(path: &str) -> Result<(), LoggingError> {
        if std::path::Path::new(path).exists() {
            Self::init_with_config(LogConfig::from_file(path)?).await
        } else {
            Self::init_default().await
        }
    }

    pub async fn init_with_config(config: LogConfig) -> Result<(), LoggingError> {
        config.validate()?;

        let config_arc = Arc::new(RwLock::new(config.clone()));
        LOGGING_CONFIG
            .set(config_arc)
            .map_err(|_| LoggingError::AlreadyInitialized)?;

        crate::web_logger::init_with(
            config.outputs.web.buffer_size,
            config.outputs.console.enabled,
        )
        .map_err(|e| LoggingError::Config(format!("Failed to install logger: {}", e)))?;
        apply_levels(&config);

        Ok(())
    }

    pub async fn get_config() -> Option<LogConfig> {
        match LOGGING_CONFIG.get() {
            Some(config_arc) => Some(config_arc.read().await.clone()),
            None => None,
        }
    }

    /// Change one feature's level at runtime
    pub async fn update_feature_level(feature: &str, level: &str) -> Result<(), LoggingError> {
        let feature = LogFeature::from_name(feature)
            .ok_or_else(|| LoggingError::Config(format!("Unknown log feature: {}", feature)))?;
        let level = level.to_uppercase();
        if parse_level(&level).is_none() {
            return Err(LoggingError::Config(format!("Invalid log level: {}", level)));
        }

        let config_arc = LOGGING_CONFIG
            .get()
            .ok_or_else(|| LoggingError::Config("Logging system not initialized".to_string()))?;
        let mut config_guard = config_arc.write().await;
        config_guard
            .features
            .insert(feature.name().to_string(), level);
        apply_levels(&config_guard);
        Ok(())
    }
}

fn parse_level(level: &str) -> Option<LevelFilter> {
    match level {
        "TRACE" => Some(LevelFilter::Trace),
        "DEBUG" => Some(LevelFilter::Debug),
        "INFO" => Some(LevelFilter::Info),
        "WARN" => Some(LevelFilter::Warn),
        "ERROR" => Some(LevelFilter::Error),
        _ => None,
    }
}

/// Target levels for every configured feature.
fn feature_levels(config: &LogConfig) -> Vec<(String, LevelFilter)> {
    config
        .features
        .iter()
        .filter_map(|(name, level)| {
            let feature = LogFeature::from_name(name)?;
            Some((feature.target().to_string(), parse_level(level)?))
        })
        .collect()
}

fn apply_levels(config: &LogConfig) {
    let default_level = parse_level(&config.general.default_level).unwrap_or(LevelFilter::Info);
    crate::web_logger::configure_levels(default_level, feature_levels(config));
}

/// Logging system errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logging system already initialized")]
    AlreadyInitialized,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Config error: {0}")]
    ConfigError(#[from] config::ConfigError),
}

pub fn get_logs() -> Vec<String> {
    crate::web_logger::get_logs()
}

pub fn subscribe() -> Option<tokio::sync::broadcast::Receiver<String>> {
    crate::web_logger::subscribe()
}

/// Install the plain web logger without a configuration
pub fn init() -> Result<(), log::SetLoggerError> {
    crate::web_logger::init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_levels_skip_unknown_features() {
        let mut config = LogConfig::default();
        config
            .features
            .insert("network".to_string(), "DEBUG".to_string());
        config
            .features
            .insert("gateway".to_string(), "DEBUG".to_string());

        let levels = feature_levels(&config);
        assert!(levels.contains(&("synthetix::gateway".to_string(), LevelFilter::Debug)));
        assert!(!levels.iter().any(|(target, _)| target.contains("network")));
        assert_eq!(levels.len(), 4);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("WARN"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("warn"), None);
    }
}
