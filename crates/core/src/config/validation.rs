//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `generation_tag` is blank, and
    /// `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `prewarm_concurrency` is 0 or exceeds 32
    /// - `scope` is not an http(s) URL
    /// - `fallback_path` or a manifest entry does not resolve against `scope`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation_tag.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "generation_tag".into(),
                hint: "Set CACHEGATE_GENERATION_TAG to the application version".into(),
            });
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 100MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.prewarm_concurrency == 0 || self.prewarm_concurrency > 32 {
            return Err(ConfigError::Invalid {
                field: "prewarm_concurrency".into(),
                reason: "must be between 1 and 32".into(),
            });
        }

        self.scope_url()?;
        self.resolve(&self.fallback_path)?;

        for entry in &self.manifest {
            let url = self.resolve(&entry.url)?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    field: "manifest".into(),
                    reason: format!("unsupported scheme for {}", entry.url),
                });
            }
        }

        if self.manifest.iter().all(|e| !e.required) {
            tracing::warn!(
                entries = self.manifest.len(),
                "manifest has no required entries; offline navigation will have no fallback document"
            );
        }

        Ok(())
    }
}
