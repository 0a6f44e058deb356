//! Core types and shared functionality for cachegate.
//!
//! This crate provides:
//! - Request/response descriptors and cache keys
//! - Collaborator traits for stores and the network
//! - Generation stores with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod store;

pub use cache::{CacheDb, GenerationStore};
pub use config::{AppConfig, ConfigError, ManifestEntry, RoutingConfig};
pub use error::Error;
pub use http::{CachedResponse, Request, RequestKey, RequestMode, Response, ResponseType};
pub use store::{CacheStore, GenerationTag, NetworkFetch, OpenedGeneration, PersistedState, StoreBackend};
