//! Collaborator contracts the engine is written against.
//!
//! The SQLite cache in [`crate::cache`] implements the storage traits and
//! `cachegate-client` implements [`NetworkFetch`] over reqwest.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::http::{CachedResponse, Request, RequestKey, Response};

/// Opaque version identifier of a cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationTag(String);

impl GenerationTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GenerationTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Persisted lifecycle marker of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistedState {
    /// Created but prewarm has not finished.
    Creating,
    Warmed,
}

impl PersistedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistedState::Creating => "creating",
            PersistedState::Warmed => "warmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "creating" => Some(PersistedState::Creating),
            "warmed" => Some(PersistedState::Warmed),
            _ => None,
        }
    }
}

/// Key→response mapping for a single generation.
///
/// Writes replace an entry atomically; concurrent access to different keys
/// is safe.
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Generation this store belongs to. Never changes.
    fn generation(&self) -> &GenerationTag;

    async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, Error>;

    async fn put(&self, key: &RequestKey, response: &Response) -> Result<(), Error>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &RequestKey) -> Result<bool, Error>;
}

/// A generation store opened by a [`StoreBackend`].
#[derive(Debug, Clone)]
pub struct OpenedGeneration {
    pub store: Arc<dyn CacheStore>,
    pub state: PersistedState,
    /// True when this call created the generation.
    pub created: bool,
}

/// Generation-scoped store management.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Open the store for `tag`, creating it when absent.
    async fn open_generation(&self, tag: &GenerationTag) -> Result<OpenedGeneration, Error>;

    async fn mark_warmed(&self, tag: &GenerationTag) -> Result<(), Error>;

    async fn list_generations(&self) -> Result<Vec<GenerationTag>, Error>;

    /// Delete a generation and every entry in it.
    async fn delete_generation(&self, tag: &GenerationTag) -> Result<bool, Error>;
}

/// Issues the real network request.
///
/// Only transport failures are errors; any HTTP status is a response.
#[async_trait]
pub trait NetworkFetch: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
