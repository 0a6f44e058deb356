//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CACHEGATE_*)
//! 2. TOML config file (if CACHEGATE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::store::GenerationTag;

mod validation;

pub use validation::ConfigError;

/// An asset fetched into a new generation before it serves traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Absolute URL, or a path resolved against `scope`.
    pub url: String,

    /// Required entries are expected to warm; failures of the others are
    /// skipped quietly.
    #[serde(default = "default_true")]
    pub required: bool,
}

impl ManifestEntry {
    pub fn required(url: impl Into<String>) -> Self {
        Self { url: url.into(), required: true }
    }

    pub fn best_effort(url: impl Into<String>) -> Self {
        Self { url: url.into(), required: false }
    }
}

/// Static routing predicates used to classify requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Hosts serving font binaries. `*.example.com` matches subdomains.
    #[serde(default = "default_font_hosts")]
    pub font_hosts: Vec<String>,

    /// File extensions of font binaries, without the dot.
    #[serde(default = "default_font_extensions")]
    pub font_extensions: Vec<String>,

    /// CDN hosts. `*.example.com` matches subdomains.
    #[serde(default = "default_cdn_hosts")]
    pub cdn_hosts: Vec<String>,
}

fn default_font_hosts() -> Vec<String> {
    vec!["fonts.gstatic.com".into(), "fonts.googleapis.com".into()]
}

fn default_font_extensions() -> Vec<String> {
    ["woff", "woff2", "ttf", "otf", "eot"].iter().map(|s| s.to_string()).collect()
}

fn default_cdn_hosts() -> Vec<String> {
    vec![
        "cdn.jsdelivr.net".into(),
        "unpkg.com".into(),
        "cdnjs.cloudflare.com".into(),
        "esm.sh".into(),
        "*.cloudfront.net".into(),
    ]
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            font_hosts: default_font_hosts(),
            font_extensions: default_font_extensions(),
            cdn_hosts: default_cdn_hosts(),
        }
    }
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CACHEGATE_*)
/// 2. TOML config file (if CACHEGATE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via CACHEGATE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum response body bytes accepted from the network.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Current generation tag. Bump it to invalidate every cached entry.
    ///
    /// Set via CACHEGATE_GENERATION_TAG environment variable.
    #[serde(default = "default_generation_tag")]
    pub generation_tag: String,

    /// Base URL the client application is served from.
    ///
    /// Relative manifest entries and the fallback path resolve against it,
    /// and its origin decides which responses are same-origin.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Root document served when a navigation cannot reach the network.
    #[serde(default = "default_fallback_path")]
    pub fallback_path: String,

    /// Assets fetched into each new generation.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<ManifestEntry>,

    /// Maximum concurrent fetches while prewarming.
    #[serde(default = "default_prewarm_concurrency")]
    pub prewarm_concurrency: usize,

    #[serde(default)]
    pub routing: RoutingConfig,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./cachegate.sqlite")
}

fn default_user_agent() -> String {
    "cachegate/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_generation_tag() -> String {
    "v1".into()
}

fn default_scope() -> String {
    "http://localhost:8080/".into()
}

fn default_fallback_path() -> String {
    "./index.html".into()
}

fn default_manifest() -> Vec<ManifestEntry> {
    vec![
        ManifestEntry::required("./index.html"),
        ManifestEntry::required("./manifest.json"),
        ManifestEntry::required("./icon.svg"),
    ]
}

fn default_prewarm_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            generation_tag: default_generation_tag(),
            scope: default_scope(),
            fallback_path: default_fallback_path(),
            manifest: default_manifest(),
            prewarm_concurrency: default_prewarm_concurrency(),
            routing: RoutingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn generation(&self) -> GenerationTag {
        GenerationTag::new(self.generation_tag.trim())
    }

    /// Parsed scope URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the scope is not an absolute http(s) URL.
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.scope)
            .map_err(|e| ConfigError::Invalid { field: "scope".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid { field: "scope".into(), reason: format!("unsupported scheme: {other}") }),
        }
    }

    /// Resolve a manifest or fallback location against the scope.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the location cannot be resolved.
    pub fn resolve(&self, location: &str) -> Result<Url, ConfigError> {
        let scope = self.scope_url()?;
        scope
            .join(location.trim())
            .map_err(|e| ConfigError::Invalid { field: location.to_string(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CACHEGATE_`
    /// 2. TOML file from `CACHEGATE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CACHEGATE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CACHEGATE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(figment)
    }

    /// Extract and validate configuration from a prepared figment.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./cachegate.sqlite"));
        assert_eq!(config.user_agent, "cachegate/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.generation(), GenerationTag::from("v1"));
        assert_eq!(config.manifest.len(), 3);
        assert!(config.manifest.iter().all(|e| e.required));
        assert!(config.routing.font_hosts.contains(&"fonts.gstatic.com".to_string()));
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_resolve_relative_paths() {
        let config = AppConfig { scope: "https://app.example.com/pwa/".into(), ..Default::default() };
        assert_eq!(config.resolve("./index.html").unwrap().as_str(), "https://app.example.com/pwa/index.html");
        assert_eq!(config.resolve("/icon.svg").unwrap().as_str(), "https://app.example.com/icon.svg");
        assert_eq!(
            config.resolve("https://fonts.googleapis.com/css2?family=Inter").unwrap().as_str(),
            "https://fonts.googleapis.com/css2?family=Inter"
        );
    }

    #[test]
    fn test_scope_url_rejects_non_http() {
        let config = AppConfig { scope: "file:///srv/app/".into(), ..Default::default() };
        assert!(matches!(config.scope_url(), Err(ConfigError::Invalid { field, .. }) if field == "scope"));
    }

    #[test]
    fn test_from_figment_toml_layer() {
        let toml = r#"
            generation_tag = "app-v7"
            scope = "https://app.example.com/"

            [[manifest]]
            url = "/index.html"

            [[manifest]]
            url = "https://fonts.googleapis.com/css2?family=Inter"
            required = false

            [routing]
            cdn_hosts = ["cdn.example.net"]
        "#;
        let figment = Figment::from(Serialized::defaults(AppConfig::default())).merge(Toml::string(toml));
        let config = AppConfig::from_figment(figment).unwrap();

        assert_eq!(config.generation_tag, "app-v7");
        assert_eq!(config.manifest.len(), 2);
        assert!(config.manifest[0].required);
        assert!(!config.manifest[1].required);
        assert_eq!(config.routing.cdn_hosts, vec!["cdn.example.net".to_string()]);
        assert_eq!(config.routing.font_extensions, default_font_extensions());
    }
}
