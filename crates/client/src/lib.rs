//! Network client for cachegate.
//!
//! This crate provides the reqwest-backed [`NetworkFetch`] implementation
//! the engine uses to reach the origin, plus URL canonicalization shared by
//! the server.
//!
//! [`NetworkFetch`]: cachegate_core::NetworkFetch

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize, canonicalize_with_base, classify_response_type};
