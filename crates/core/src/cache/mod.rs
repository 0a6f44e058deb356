//! SQLite-backed generation stores.
//!
//! Every generation is a row in `generations`; its entries live in `entries`
//! and cascade away when the generation row is deleted. It supports:
//!
//! - Content-addressed entry keys using SHA-256 of method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Atomic per-key replacement via UPSERT

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{EntrySummary, GenerationStore};
pub use generations::GenerationRecord;
