//! Request and response descriptors shared by the engine, the store and the
//! network client.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::Error;
use crate::cache::hash::compute_request_key;

/// How the intercepted request was issued by the client application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Navigate => "navigate",
            RequestMode::SameOrigin => "same-origin",
            RequestMode::NoCors => "no-cors",
            RequestMode::Cors => "cors",
        }
    }
}

impl std::str::FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "navigate" => Ok(RequestMode::Navigate),
            "same-origin" => Ok(RequestMode::SameOrigin),
            "no-cors" => Ok(RequestMode::NoCors),
            "cors" => Ok(RequestMode::Cors),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Upper-cased HTTP method.
    pub method: String,
    pub url: Url,
    pub mode: RequestMode,
}

impl Request {
    pub fn new(method: &str, url: Url, mode: RequestMode) -> Self {
        Self { method: method.trim().to_ascii_uppercase(), url, mode }
    }

    pub fn get(url: Url, mode: RequestMode) -> Self {
        Self::new("GET", url, mode)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// The cache slot this request maps to.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// Cache slot identity: method plus absolute URL, fragment removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    pub url: Url,
    hash: String,
}

impl RequestKey {
    pub fn new(method: &str, url: &Url) -> Self {
        let method = method.trim().to_ascii_uppercase();
        let mut url = url.clone();
        url.set_fragment(None);
        let hash = compute_request_key(&method, url.as_str());
        Self { method, url, hash }
    }

    /// Content-addressed hash used as the storage key.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// Origin relationship of a response, mirroring the fetch response types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response permitted by the origin.
    Cors,
    /// Cross-origin response the application is not allowed to inspect.
    Opaque,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            "opaque" => Some(ResponseType::Opaque),
            _ => None,
        }
    }
}

/// A response snapshot: status, headers and a shared body buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub response_type: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Independent copy for a second consumer.
    ///
    /// The body is reference counted, so the store write and the caller each
    /// hold a full view of it and neither read can starve the other.
    pub fn duplicate(&self) -> Self {
        Self {
            url: self.url.clone(),
            status: self.status,
            response_type: self.response_type,
            headers: self.headers.clone(),
            body: Bytes::clone(&self.body),
        }
    }
}

/// A response as persisted in a generation store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub response: Response,
    /// RFC 3339 timestamp assigned by the store on write.
    pub stored_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_request_method_normalized() {
        let req = Request::new(" get ", url("https://example.com/"), RequestMode::NoCors);
        assert_eq!(req.method, "GET");
        assert!(req.is_get());
    }

    #[test]
    fn test_key_ignores_fragment() {
        let a = RequestKey::new("GET", &url("https://example.com/app.js#top"));
        let b = RequestKey::new("GET", &url("https://example.com/app.js"));
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_key_keeps_query() {
        let a = RequestKey::new("GET", &url("https://example.com/app.js?v=1"));
        let b = RequestKey::new("GET", &url("https://example.com/app.js?v=2"));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_key_depends_on_method() {
        let a = RequestKey::new("GET", &url("https://example.com/x"));
        let b = RequestKey::new("HEAD", &url("https://example.com/x"));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_request_mode_parse() {
        assert_eq!("navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("No-Cors".parse::<RequestMode>().unwrap(), RequestMode::NoCors);
        assert!("websocket".parse::<RequestMode>().is_err());
    }

    #[test]
    fn test_duplicate_shares_body() {
        let response = Response {
            url: url("https://example.com/"),
            status: 200,
            response_type: ResponseType::Basic,
            headers: vec![("Content-Type".into(), "text/html".into())],
            body: Bytes::from_static(b"<html></html>"),
        };
        let copy = response.duplicate();
        assert_eq!(copy, response);
        assert_eq!(copy.body.as_ptr(), response.body.as_ptr());
        assert_eq!(copy.content_type(), Some("text/html"));
    }

    #[test]
    fn test_response_type_round_trip_names() {
        for t in [ResponseType::Basic, ResponseType::Cors, ResponseType::Opaque] {
            assert_eq!(ResponseType::parse(t.as_str()), Some(t));
        }
        assert_eq!(ResponseType::parse("error"), None);
    }
}
