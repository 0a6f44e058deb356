//! Serve from the store while revalidating from the network.
//!
//! The fetch starts on the background queue before the store is read, so
//! the two overlap. A cache hit answers immediately and the fetch finishes
//! on its own, refreshing the entry when its response is admitted. On a miss
//! the caller waits for that same fetch.

use tokio::sync::oneshot;

use cachegate_core::{Error, Request, Response, ResponseType};

use super::{RequestOutcome, StrategyContext, lookup_or_miss, put_logged};

/// Which network responses may replace a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Any 2xx response.
    AnyOk,
    /// Status 200 with a `basic` or `cors` response type, so opaque
    /// cross-origin bodies are never persisted.
    SameOriginOk,
}

impl Admission {
    pub fn admits(&self, response: &Response) -> bool {
        match self {
            Admission::AnyOk => response.is_ok(),
            Admission::SameOriginOk => {
                response.status == 200 && matches!(response.response_type, ResponseType::Basic | ResponseType::Cors)
            }
        }
    }
}

pub(super) async fn run(request: &Request, ctx: &StrategyContext, admission: Admission) -> Result<RequestOutcome, Error> {
    let key = request.key();
    let (tx, rx) = oneshot::channel::<Option<Response>>();

    {
        let network = ctx.network.clone();
        let store = ctx.store.clone();
        let request = request.clone();
        let key = key.clone();
        ctx.tasks.spawn(async move {
            let fetched = match network.fetch(&request).await {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "revalidation fetch failed");
                    None
                }
            };

            let admitted = fetched
                .as_ref()
                .filter(|r| admission.admits(r))
                .map(Response::duplicate);

            // the caller may have been answered from the store already
            let _ = tx.send(fetched);

            if let Some(copy) = admitted {
                put_logged(store.as_ref(), &key, &copy).await;
            }
        });
    }

    if let Some(hit) = lookup_or_miss(ctx.store.as_ref(), &key).await {
        tracing::debug!(key = %key, "serving cached entry, revalidating");
        return Ok(RequestOutcome::Cache(hit.response));
    }

    match rx.await {
        Ok(Some(response)) => Ok(RequestOutcome::Network(response)),
        Ok(None) | Err(_) => Ok(RequestOutcome::Unavailable),
    }
}
