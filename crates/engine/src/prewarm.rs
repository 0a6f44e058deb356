//! Prewarm a freshly created generation from the asset manifest.
//!
//! Entries are fetched independently with bounded concurrency. A failed
//! entry never aborts the others; every outcome lands in the report.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use cachegate_core::{CacheStore, Error, NetworkFetch, Request, RequestMode};

/// Manifest entry resolved to an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrewarmTarget {
    pub url: Url,
    pub required: bool,
}

impl PrewarmTarget {
    pub fn new(url: Url, required: bool) -> Self {
        Self { url, required }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrewarmFailure {
    pub url: String,
    pub required: bool,
    pub error: String,
}

/// What a prewarm pass stored and what it could not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrewarmReport {
    pub inserted: Vec<String>,
    pub failures: Vec<PrewarmFailure>,
}

impl PrewarmReport {
    pub fn required_failures(&self) -> usize {
        self.failures.iter().filter(|f| f.required).count()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetches manifest entries into a generation store.
#[derive(Clone)]
pub struct Prewarmer {
    network: Arc<dyn NetworkFetch>,
    concurrency: usize,
}

impl Prewarmer {
    pub fn new(network: Arc<dyn NetworkFetch>, concurrency: usize) -> Self {
        Self { network, concurrency: concurrency.max(1) }
    }

    /// Fetch and insert every target. Completion order is unspecified.
    pub async fn warm(&self, store: Arc<dyn CacheStore>, targets: &[PrewarmTarget]) -> PrewarmReport {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for target in targets.iter().cloned() {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let network = self.network.clone();
            let store = store.clone();

            join_set.spawn(async move {
                let _permit = permit;
                let result = warm_one(network.as_ref(), store.as_ref(), &target.url).await;
                (target, result)
            });
        }

        let mut report = PrewarmReport::default();
        while let Some(joined) = join_set.join_next().await {
            let (target, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::error!(error = %e, "prewarm task failed to complete");
                    continue;
                }
            };

            match result {
                Ok(()) => report.inserted.push(target.url.to_string()),
                Err(e) => {
                    if target.required {
                        tracing::warn!(url = %target.url, error = %e, "required manifest entry failed to prewarm");
                    } else {
                        tracing::debug!(url = %target.url, error = %e, "optional manifest entry skipped");
                    }
                    report.failures.push(PrewarmFailure {
                        url: target.url.to_string(),
                        required: target.required,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            generation = %store.generation(),
            inserted = report.inserted.len(),
            failed = report.failures.len(),
            "prewarm finished"
        );
        report
    }
}

async fn warm_one(network: &dyn NetworkFetch, store: &dyn CacheStore, url: &Url) -> Result<(), Error> {
    let request = Request::get(url.clone(), RequestMode::Cors);
    let response = network.fetch(&request).await?;
    if !response.is_ok() {
        return Err(Error::Network(format!("{url}: unexpected status {}", response.status)));
    }
    store.put(&request.key(), &response).await
}
