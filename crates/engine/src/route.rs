//! Route classification of intercepted requests.
//!
//! Classification is a priority table, first match wins:
//!
//! 1. navigation intent → [`RouteClass::Navigation`]
//! 2. font host or font file extension → [`RouteClass::Font`]
//! 3. CDN host → [`RouteClass::Cdn`]
//! 4. anything else → [`RouteClass::LocalAsset`]
//!
//! Non-GET requests and non-http(s) schemes are not classified at all and
//! pass through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

use cachegate_core::{Request, RequestMode, RoutingConfig};

/// Static category of a request. Each class maps to exactly one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    Navigation,
    Font,
    Cdn,
    LocalAsset,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Navigation => "navigation",
            RouteClass::Font => "font",
            RouteClass::Cdn => "cdn",
            RouteClass::LocalAsset => "local_asset",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host predicate: an exact host, or `*.suffix` for any subdomain of suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    Exact(String),
    Subdomain(String),
}

impl HostPattern {
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_ascii_lowercase();
        match pattern.strip_prefix("*.") {
            Some(suffix) => HostPattern::Subdomain(format!(".{suffix}")),
            None => HostPattern::Exact(pattern),
        }
    }

    /// `host` must already be lowercase.
    pub fn matches(&self, host: &str) -> bool {
        match self {
            HostPattern::Exact(h) => host == h,
            HostPattern::Subdomain(suffix) => host.len() > suffix.len() && host.ends_with(suffix.as_str()),
        }
    }
}

/// Pure request → route mapping built from [`RoutingConfig`].
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    font_hosts: Vec<HostPattern>,
    font_extensions: Vec<String>,
    cdn_hosts: Vec<HostPattern>,
}

impl RouteClassifier {
    pub fn new(config: &RoutingConfig) -> Self {
        Self {
            font_hosts: config.font_hosts.iter().map(|h| HostPattern::parse(h)).collect(),
            font_extensions: config
                .font_extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            cdn_hosts: config.cdn_hosts.iter().map(|h| HostPattern::parse(h)).collect(),
        }
    }

    /// Classify a request. `None` means pass through without caching.
    pub fn classify(&self, request: &Request) -> Option<RouteClass> {
        if !request.is_get() || !matches!(request.url.scheme(), "http" | "https") {
            return None;
        }

        if request.mode == RequestMode::Navigate {
            return Some(RouteClass::Navigation);
        }

        let host = request.url.host_str().unwrap_or_default().to_ascii_lowercase();

        if self.font_hosts.iter().any(|p| p.matches(&host)) || self.has_font_extension(request) {
            return Some(RouteClass::Font);
        }

        if self.cdn_hosts.iter().any(|p| p.matches(&host)) {
            return Some(RouteClass::Cdn);
        }

        Some(RouteClass::LocalAsset)
    }

    fn has_font_extension(&self, request: &Request) -> bool {
        let Some(segment) = request.url.path_segments().and_then(|mut s| s.next_back()) else {
            return false;
        };
        match segment.rsplit_once('.') {
            Some((_, ext)) => self.font_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}
