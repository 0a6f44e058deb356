//! The proxy engine and its three lifecycle messages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

use cachegate_core::{
    AppConfig, CacheStore, ConfigError, Error, GenerationTag, NetworkFetch, Request, RequestMode, RoutingConfig,
    StoreBackend,
};

use crate::generation::{CollectReport, GenerationManager, GenerationState};
use crate::prewarm::{PrewarmReport, PrewarmTarget, Prewarmer};
use crate::route::{RouteClass, RouteClassifier};
use crate::strategy::{self, RequestOutcome, Strategy, StrategyContext};
use crate::tasks::BackgroundTasks;

/// Static inputs of an engine, resolved to absolute URLs.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tag: GenerationTag,
    pub fallback: Url,
    pub manifest: Vec<PrewarmTarget>,
    pub routing: RoutingConfig,
    pub prewarm_concurrency: usize,
}

impl EngineSettings {
    /// Resolve the fallback document and manifest against the app scope.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let manifest = config
            .manifest
            .iter()
            .map(|entry| Ok(PrewarmTarget::new(config.resolve(&entry.url)?, entry.required)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            tag: config.generation(),
            fallback: config.resolve(&config.fallback_path)?,
            manifest,
            routing: config.routing.clone(),
            prewarm_concurrency: config.prewarm_concurrency,
        })
    }
}

/// Intercepts requests and answers them from the current generation or the
/// network.
///
/// Construct one, send it `on_generation_start`, then
/// `on_generation_activate`, then any number of `on_request`. Requests that
/// arrive before start pass through to the network.
pub struct ProxyEngine {
    tag: GenerationTag,
    fallback: Request,
    classifier: RouteClassifier,
    generations: GenerationManager,
    network: Arc<dyn NetworkFetch>,
    tasks: BackgroundTasks,
    current: RwLock<Option<Arc<dyn CacheStore>>>,
    activated: AtomicBool,
}

impl ProxyEngine {
    pub fn new(settings: EngineSettings, backend: Arc<dyn StoreBackend>, network: Arc<dyn NetworkFetch>) -> Self {
        let prewarmer = Prewarmer::new(network.clone(), settings.prewarm_concurrency);
        Self {
            tag: settings.tag,
            fallback: Request::get(settings.fallback, RequestMode::NoCors),
            classifier: RouteClassifier::new(&settings.routing),
            generations: GenerationManager::new(backend, prewarmer, settings.manifest),
            network,
            tasks: BackgroundTasks::new(),
            current: RwLock::new(None),
            activated: AtomicBool::new(false),
        }
    }

    pub fn from_config(
        config: &AppConfig, backend: Arc<dyn StoreBackend>, network: Arc<dyn NetworkFetch>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(EngineSettings::from_config(config)?, backend, network))
    }

    pub fn generation_tag(&self) -> &GenerationTag {
        &self.tag
    }

    pub fn generation_state(&self) -> GenerationState {
        self.generations.state(&self.tag)
    }

    pub fn generations(&self) -> &GenerationManager {
        &self.generations
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::Acquire)
    }

    /// Store of the current generation, once started.
    pub fn current_store(&self) -> Option<Arc<dyn CacheStore>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn route(&self, request: &Request) -> Option<RouteClass> {
        self.classifier.classify(request)
    }

    /// Create and prewarm the current generation.
    ///
    /// Returns once the prewarm has finished. Background writes already in
    /// flight are not awaited.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreCreate` if the generation store cannot be created.
    pub async fn on_generation_start(&self) -> Result<Option<PrewarmReport>, Error> {
        tracing::info!(generation = %self.tag, "generation starting");
        let ensured = self.generations.ensure_current_generation(&self.tag).await?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(ensured.store);
        Ok(ensured.prewarm)
    }

    /// Delete stale generations, then take over request handling.
    ///
    /// # Errors
    ///
    /// Returns an error if the generations cannot be listed. Individual
    /// deletion failures are reported, never returned.
    pub async fn on_generation_activate(&self) -> Result<CollectReport, Error> {
        let report = self.generations.collect_stale(&self.tag).await?;
        self.activated.store(true, Ordering::Release);
        tracing::info!(
            generation = %self.tag,
            deleted = report.deleted.len(),
            failed = report.failures.len(),
            "generation activated"
        );
        Ok(report)
    }

    /// Handle one intercepted request.
    ///
    /// # Errors
    ///
    /// Network errors propagate for pass-through requests and font misses.
    /// Everything else resolves to a [`RequestOutcome`].
    pub async fn on_request(&self, request: &Request) -> Result<RequestOutcome, Error> {
        let route = self.classifier.classify(request);
        let strategy = Strategy::for_route(route);

        let store = match (strategy, self.current_store()) {
            (Strategy::Passthrough, _) => return strategy::passthrough(self.network.as_ref(), request).await,
            (_, None) => {
                tracing::debug!(url = %request.url, "no generation yet, passing through");
                return strategy::passthrough(self.network.as_ref(), request).await;
            }
            (_, Some(store)) => store,
        };

        let ctx = StrategyContext {
            store,
            network: self.network.clone(),
            tasks: self.tasks.clone(),
            fallback: self.fallback.key(),
        };
        let outcome = strategy::execute(strategy, request, &ctx).await?;

        tracing::debug!(
            url = %request.url,
            route = route.map(|r| r.as_str()).unwrap_or("none"),
            outcome = outcome.source(),
            "request handled"
        );
        Ok(outcome)
    }

    /// Background work submitted and not yet finished.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.pending()
    }

    /// Wait for every background write to finish.
    pub async fn drain(&self) {
        self.tasks.drain().await;
    }
}
