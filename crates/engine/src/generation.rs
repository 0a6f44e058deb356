//! Generation lifecycle: create and prewarm the current generation, delete
//! the stale ones.
//!
//! ```text
//! Absent -> Creating -> Warmed -> Stale -> Deleted
//! ```
//!
//! Operations on one tag are serialized by a per-tag async mutex, so a
//! delete never interleaves with a prewarm of the same tag. Different tags
//! proceed independently.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

use cachegate_core::{CacheStore, Error, GenerationTag, PersistedState, StoreBackend};

use crate::prewarm::{PrewarmReport, PrewarmTarget, Prewarmer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    Absent,
    Creating,
    Warmed,
    Stale,
    Deleted,
}

/// Store for the current generation plus the prewarm it triggered, if any.
#[derive(Debug, Clone)]
pub struct EnsuredGeneration {
    pub store: Arc<dyn CacheStore>,
    pub prewarm: Option<PrewarmReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectFailure {
    pub tag: GenerationTag,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectReport {
    pub deleted: Vec<GenerationTag>,
    pub failures: Vec<CollectFailure>,
}

/// Owns tag transitions and store deletion.
pub struct GenerationManager {
    backend: Arc<dyn StoreBackend>,
    prewarmer: Prewarmer,
    manifest: Vec<PrewarmTarget>,
    index: Mutex<HashMap<GenerationTag, GenerationState>>,
    locks: Mutex<HashMap<GenerationTag, Arc<AsyncMutex<()>>>>,
}

impl GenerationManager {
    pub fn new(backend: Arc<dyn StoreBackend>, prewarmer: Prewarmer, manifest: Vec<PrewarmTarget>) -> Self {
        Self { backend, prewarmer, manifest, index: Mutex::new(HashMap::new()), locks: Mutex::new(HashMap::new()) }
    }

    fn index(&self) -> MutexGuard<'_, HashMap<GenerationTag, GenerationState>> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tag_lock(&self, tag: &GenerationTag) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(tag.clone()).or_default().clone()
    }

    /// Forget the lock of a deleted tag once nobody else holds it.
    fn release_lock(&self, tag: &GenerationTag) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(tag).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(tag);
        }
    }

    fn set_state(&self, tag: &GenerationTag, state: GenerationState) {
        self.index().insert(tag.clone(), state);
    }

    /// Last known state of `tag` in this process.
    pub fn state(&self, tag: &GenerationTag) -> GenerationState {
        self.index().get(tag).copied().unwrap_or(GenerationState::Absent)
    }

    /// Snapshot of every tag this manager has seen, sorted by tag.
    pub fn states(&self) -> Vec<(GenerationTag, GenerationState)> {
        let mut states: Vec<_> = self.index().iter().map(|(t, s)| (t.clone(), *s)).collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    /// Open the store for `tag`, creating and prewarming it when needed.
    ///
    /// A generation whose persisted state is still `creating` (new, or left
    /// behind by an interrupted prewarm) is prewarmed. A warmed generation
    /// never is.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreCreate` if the store cannot be created or opened.
    /// Prewarm failures are reported, never returned.
    pub async fn ensure_current_generation(&self, tag: &GenerationTag) -> Result<EnsuredGeneration, Error> {
        let lock = self.tag_lock(tag);
        let _guard = lock.lock().await;

        let opened = self.backend.open_generation(tag).await?;
        let already_warmed = self.state(tag) == GenerationState::Warmed;

        let prewarm = match opened.state {
            PersistedState::Creating if !already_warmed => {
                if !opened.created {
                    tracing::info!(generation = %tag, "resuming interrupted prewarm");
                }
                self.set_state(tag, GenerationState::Creating);

                let report = self.prewarmer.warm(opened.store.clone(), &self.manifest).await;
                if let Err(e) = self.backend.mark_warmed(tag).await {
                    tracing::warn!(generation = %tag, error = %e, "failed to persist warmed state");
                }
                Some(report)
            }
            _ => None,
        };

        self.promote(tag).await;
        tracing::info!(generation = %tag, prewarmed = prewarm.is_some(), "generation ready");

        Ok(EnsuredGeneration { store: opened.store, prewarm })
    }

    /// Mark `tag` warmed and every other known generation stale.
    async fn promote(&self, tag: &GenerationTag) {
        let persisted = match self.backend.list_generations().await {
            Ok(tags) => tags,
            Err(e) => {
                tracing::warn!(generation = %tag, error = %e, "could not list generations, other states left unchanged");
                Vec::new()
            }
        };

        let mut index = self.index();
        for other in persisted {
            if &other != tag {
                index.insert(other, GenerationState::Stale);
            }
        }
        for (other, state) in index.iter_mut() {
            if other != tag && *state == GenerationState::Warmed {
                *state = GenerationState::Stale;
            }
        }
        index.insert(tag.clone(), GenerationState::Warmed);
    }

    /// Delete every generation except `current`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the generations cannot be listed. Failures to
    /// delete individual generations are logged and reported.
    pub async fn collect_stale(&self, current: &GenerationTag) -> Result<CollectReport, Error> {
        let tags = self.backend.list_generations().await?;
        let mut report = CollectReport::default();

        for tag in tags.into_iter().filter(|t| t != current) {
            let lock = self.tag_lock(&tag);
            let guard = lock.lock().await;
            let deleted = self.backend.delete_generation(&tag).await;
            drop(guard);
            drop(lock);

            match deleted {
                Ok(_) => {
                    tracing::info!(generation = %tag, "deleted stale generation");
                    self.set_state(&tag, GenerationState::Deleted);
                    self.release_lock(&tag);
                    report.deleted.push(tag);
                }
                Err(e) => {
                    tracing::warn!(generation = %tag, error = %e, "failed to delete stale generation");
                    report.failures.push(CollectFailure { tag, error: e.to_string() });
                }
            }
        }

        Ok(report)
    }
}
