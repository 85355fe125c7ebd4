//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

use super::PoolConfig;
use crate::executor::Backend;
use crate::utils::LogLevel;

/// Environment variable prefix
const ENV_PREFIX: &str = "UNITEST";

/// Configuration overrides read from the environment
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Worker count from UNITEST_WORKERS
    pub workers: Option<usize>,
    /// Within-batch limit from UNITEST_TEST_CONCURRENCY
    pub test_concurrency: Option<usize>,
    /// Result checking from UNITEST_CHECK_RESULTS
    pub check_results: Option<bool>,
    /// Backend from UNITEST_BACKEND
    pub backend: Option<String>,
    /// Config file from UNITEST_CONFIG
    pub config_file: Option<String>,
    /// Log level from UNITEST_LOG
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            workers: get_env_parse("WORKERS"),
            test_concurrency: get_env_parse("TEST_CONCURRENCY"),
            check_results: get_env_bool("CHECK_RESULTS"),
            backend: get_env("BACKEND"),
            config_file: get_env("CONFIG"),
            log_level: get_env("LOG"),
        }
    }

    /// Check if any environment variables are set
    pub fn has_any(&self) -> bool {
        self.workers.is_some()
            || self.test_concurrency.is_some()
            || self.check_results.is_some()
            || self.backend.is_some()
            || self.config_file.is_some()
            || self.log_level.is_some()
    }

    /// Apply overrides on top of `config`; unparsable values are ignored
    pub fn apply(&self, mut config: PoolConfig) -> PoolConfig {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(limit) = self.test_concurrency {
            config.test_concurrency = Some(limit);
        }
        if let Some(check) = self.check_results {
            config.check_results = check;
        }
        if let Some(backend) = self.backend.as_deref().and_then(Backend::from_str) {
            config.backend = backend;
        }
        if let Some(level) = self.log_level.as_deref().and_then(|l| l.parse::<LogLevel>().ok()) {
            config.log_level = level;
        }
        config
    }
}

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}")).ok()
}

/// Get environment variable and parse to type
fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Get environment variable as boolean
fn get_env_bool(name: &str) -> Option<bool> {
    get_env(name).map(|v| {
        matches!(
            v.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on" | "enabled"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let overrides = EnvConfig {
            workers: Some(3),
            check_results: Some(true),
            backend: Some("cooperative".to_string()),
            log_level: Some("debug".to_string()),
            ..EnvConfig::default()
        };
        assert!(overrides.has_any());

        let config = overrides.apply(PoolConfig::default());
        assert_eq!(config.workers, 3);
        assert!(config.check_results);
        assert_eq!(config.backend, Backend::Cooperative);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_unparsable_values_ignored() {
        let overrides = EnvConfig {
            backend: Some("processes".to_string()),
            log_level: Some("loud".to_string()),
            ..EnvConfig::default()
        };

        let config = overrides.apply(PoolConfig::default());
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn test_empty_overrides() {
        assert!(!EnvConfig::default().has_any());
    }
}
