//! Offline-first caching proxy engine.
//!
//! A [`ProxyEngine`] classifies every intercepted request into a
//! [`RouteClass`], runs the matching [`Strategy`] against the current
//! generation's store and the network, and keeps exactly one generation
//! alive once activated.

pub mod engine;
pub mod generation;
pub mod prewarm;
pub mod route;
pub mod strategy;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use engine::{EngineSettings, ProxyEngine};
pub use generation::{CollectFailure, CollectReport, EnsuredGeneration, GenerationManager, GenerationState};
pub use prewarm::{PrewarmFailure, PrewarmReport, PrewarmTarget, Prewarmer};
pub use route::{HostPattern, RouteClass, RouteClassifier};
pub use strategy::{Admission, RequestOutcome, Strategy, StrategyContext};
pub use tasks::BackgroundTasks;
