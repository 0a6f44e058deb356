//! URL canonicalization for consistent request keys.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize an intercepted URL, resolving relative input against `base`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve against `base` when given, else default the scheme to https://
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// Non-http(s) schemes are returned as-is so the classifier can pass them
/// through; `canonicalize` is the strict variant.
pub fn canonicalize_with_base(input: &str, base: Option<&url::Url>) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = match (url::Url::parse(trimmed), base) {
        (Ok(url), _) => url,
        (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => {
            base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        (Err(url::ParseError::RelativeUrlWithoutBase), None) => {
            url::Url::parse(&format!("https://{trimmed}")).map_err(|e| UrlError::InvalidUrl(e.to_string()))?
        }
        (Err(e), _) => return Err(UrlError::InvalidUrl(e.to_string())),
    };

    let lowered = parsed
        .host_str()
        .filter(|h| h.chars().any(|c| c.is_ascii_uppercase()))
        .map(str::to_lowercase);
    if let Some(host) = lowered {
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Canonicalize an absolute http(s) URL.
pub fn canonicalize(input: &str) -> Result<url::Url, UrlError> {
    let parsed = canonicalize_with_base(input, None)?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }
}
