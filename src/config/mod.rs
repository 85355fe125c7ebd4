//! Configuration module
//!
//! Handles loading and managing scheduler configuration.

pub mod env;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::executor::{
    default_test_concurrency, Backend, FallbackPolicy, PoolOptions, DEFAULT_CRASH_THRESHOLD,
};
use crate::utils::LogLevel;

pub use env::EnvConfig;

/// Scheduler configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Worker threads (and concurrent batches on the fallback backend)
    pub workers: usize,

    /// Tests of one batch run at once on the fallback backend
    pub test_concurrency: Option<usize>,

    /// Fail tests that return an error value
    pub check_results: bool,

    /// Package root module locators are resolved against
    pub package: String,

    /// Execution backend
    pub backend: Backend,

    /// Worker crashes tolerated before falling back
    pub crash_threshold: usize,

    /// What the fallback backend takes over
    pub fallback_policy: FallbackPolicy,

    /// Log level for the binary
    pub log_level: LogLevel,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_test_concurrency(),
            test_concurrency: None,
            check_results: false,
            package: String::new(),
            backend: Backend::Auto,
            crash_threshold: DEFAULT_CRASH_THRESHOLD,
            fallback_policy: FallbackPolicy::RemainingBatches,
            log_level: LogLevel::Info,
        }
    }
}

impl PoolConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.crash_threshold == 0 {
            bail!("crash_threshold must be at least 1");
        }
        if self.test_concurrency == Some(0) {
            bail!("test_concurrency must be at least 1");
        }
        Ok(())
    }

    /// Scheduler options for this configuration
    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            workers: self.workers.max(1),
            test_concurrency: self.test_concurrency,
            check_results: self.check_results,
            package: self.package.clone(),
            backend: self.backend,
            crash_threshold: self.crash_threshold,
            fallback_policy: self.fallback_policy,
        }
    }
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}
