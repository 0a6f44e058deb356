//! Strategy executors.
//!
//! Every route class maps statically to one [`Strategy`]:
//!
//! | Route        | Strategy                                   |
//! |--------------|--------------------------------------------|
//! | none         | pass-through, no store interaction         |
//! | Navigation   | network first, fall back to the store      |
//! | Font         | cache first, fill on miss                  |
//! | Cdn          | cache first, revalidate in the background  |
//! | LocalAsset   | stale-while-revalidate, same-origin only   |
//!
//! Each executor attempts the network at most once per request. Store reads
//! that fail are treated as misses; store writes that fail are logged.

mod cache_first;
mod network_first;
mod revalidate;

use std::sync::Arc;

use cachegate_core::{CacheStore, CachedResponse, Error, NetworkFetch, Request, RequestKey, Response};

use crate::route::RouteClass;
use crate::tasks::BackgroundTasks;

pub use revalidate::Admission;

/// Fetch/cache orchestration protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Passthrough,
    NetworkFirst,
    CacheFirst,
    Revalidate(Admission),
}

impl Strategy {
    pub fn for_route(route: Option<RouteClass>) -> Self {
        match route {
            None => Strategy::Passthrough,
            Some(RouteClass::Navigation) => Strategy::NetworkFirst,
            Some(RouteClass::Font) => Strategy::CacheFirst,
            Some(RouteClass::Cdn) => Strategy::Revalidate(Admission::AnyOk),
            Some(RouteClass::LocalAsset) => Strategy::Revalidate(Admission::SameOriginOk),
        }
    }
}

/// Result of handling an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Live response from the network.
    Network(Response),
    /// Served from the current generation's store.
    Cache(Response),
    /// Not intercepted; the network response is returned untouched.
    Passthrough(Response),
    /// Neither the store nor the network produced a response.
    Unavailable,
}

impl RequestOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            RequestOutcome::Network(r) | RequestOutcome::Cache(r) | RequestOutcome::Passthrough(r) => Some(r),
            RequestOutcome::Unavailable => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            RequestOutcome::Network(r) | RequestOutcome::Cache(r) | RequestOutcome::Passthrough(r) => Some(r),
            RequestOutcome::Unavailable => None,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            RequestOutcome::Network(_) => "network",
            RequestOutcome::Cache(_) => "cache",
            RequestOutcome::Passthrough(_) => "passthrough",
            RequestOutcome::Unavailable => "unavailable",
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, RequestOutcome::Unavailable)
    }
}

/// Everything an executor needs besides the request.
#[derive(Clone)]
pub struct StrategyContext {
    pub store: Arc<dyn CacheStore>,
    pub network: Arc<dyn NetworkFetch>,
    pub tasks: BackgroundTasks,
    /// Root document served when a navigation cannot reach the network.
    pub fallback: RequestKey,
}

/// Run `strategy` for `request`.
///
/// # Errors
///
/// Returns the network error for pass-through and cache-first misses when
/// the fetch fails. Every other strategy reports missing data as
/// [`RequestOutcome::Unavailable`].
pub async fn execute(strategy: Strategy, request: &Request, ctx: &StrategyContext) -> Result<RequestOutcome, Error> {
    match strategy {
        Strategy::Passthrough => passthrough(ctx.network.as_ref(), request).await,
        Strategy::NetworkFirst => network_first::run(request, ctx).await,
        Strategy::CacheFirst => cache_first::run(request, ctx).await,
        Strategy::Revalidate(admission) => revalidate::run(request, ctx, admission).await,
    }
}

/// Forward a request without touching any store.
pub async fn passthrough(network: &dyn NetworkFetch, request: &Request) -> Result<RequestOutcome, Error> {
    network.fetch(request).await.map(RequestOutcome::Passthrough)
}

/// Store read where a failing store counts as a miss.
async fn lookup_or_miss(store: &dyn CacheStore, key: &RequestKey) -> Option<CachedResponse> {
    match store.lookup(key).await {
        Ok(hit) => hit,
        Err(e) => {
            tracing::warn!(key = %key, generation = %store.generation(), error = %e, "store read failed, treating as miss");
            None
        }
    }
}

/// Store write where failure only leaves the cache colder.
async fn put_logged(store: &dyn CacheStore, key: &RequestKey, response: &Response) {
    match store.put(key, response).await {
        Ok(()) => tracing::debug!(key = %key, generation = %store.generation(), "stored response"),
        Err(e) => tracing::warn!(key = %key, error = %e, "store write failed"),
    }
}
