//! Network first, fall back to the store.

use cachegate_core::{Error, Request};

use super::{RequestOutcome, StrategyContext, lookup_or_miss, put_logged};

/// Prefer the live network response; on failure serve the fallback root
/// document, else the exact entry, else report the request unavailable.
pub(super) async fn run(request: &Request, ctx: &StrategyContext) -> Result<RequestOutcome, Error> {
    let key = request.key();

    match ctx.network.fetch(request).await {
        Ok(response) => {
            if response.is_ok() {
                let store = ctx.store.clone();
                let copy = response.duplicate();
                ctx.tasks.spawn(async move {
                    put_logged(store.as_ref(), &key, &copy).await;
                });
            }
            Ok(RequestOutcome::Network(response))
        }
        Err(e) => {
            tracing::debug!(url = %request.url, error = %e, "navigation fetch failed, falling back to store");

            if let Some(hit) = lookup_or_miss(ctx.store.as_ref(), &ctx.fallback).await {
                return Ok(RequestOutcome::Cache(hit.response));
            }
            if let Some(hit) = lookup_or_miss(ctx.store.as_ref(), &key).await {
                return Ok(RequestOutcome::Cache(hit.response));
            }

            tracing::info!(url = %request.url, "navigation unavailable: offline and not cached");
            Ok(RequestOutcome::Unavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{Strategy, execute};
    use crate::testing::{ScriptedNetwork, context, get, response};
    use cachegate_core::{RequestMode, ResponseType};

    const INDEX: &str = "https://app.test/index.html";
    const PAGE: &str = "https://app.test/settings";

    #[tokio::test]
    async fn test_network_success_returns_live_and_stores_in_background() {
        let network = ScriptedNetwork::new();
        network.respond_ok(PAGE, "live");
        let (_db, ctx) = context(network.clone(), INDEX).await;
        let request = get(PAGE, RequestMode::Navigate);

        let outcome = execute(Strategy::NetworkFirst, &request, &ctx).await.unwrap();
        assert_eq!(outcome, RequestOutcome::Network(response(PAGE, 200, ResponseType::Basic, "live")));

        ctx.tasks.drain().await;
        let stored = ctx.store.lookup(&request.key()).await.unwrap().unwrap();
        assert_eq!(&stored.response.body[..], b"live");
    }

    #[tokio::test]
    async fn test_error_status_is_returned_but_not_stored() {
        let network = ScriptedNetwork::new();
        network.respond(PAGE, 503, ResponseType::Basic, "maintenance");
        let (_db, ctx) = context(network.clone(), INDEX).await;
        let request = get(PAGE, RequestMode::Navigate);

        let outcome = execute(Strategy::NetworkFirst, &request, &ctx).await.unwrap();
        ctx.tasks.drain().await;

        assert_eq!(outcome.response().map(|r| r.status), Some(503));
        assert!(ctx.store.lookup(&request.key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_offline_prefers_fallback_document() {
        let network = ScriptedNetwork::new();
        network.fail(PAGE);
        let (_db, ctx) = context(network.clone(), INDEX).await;
        let request = get(PAGE, RequestMode::Navigate);
        ctx.store
            .put(&get(INDEX, RequestMode::NoCors).key(), &response(INDEX, 200, ResponseType::Basic, "shell"))
            .await
            .unwrap();
        ctx.store
            .put(&request.key(), &response(PAGE, 200, ResponseType::Basic, "old settings"))
            .await
            .unwrap();

        let outcome = execute(Strategy::NetworkFirst, &request, &ctx).await.unwrap();
        assert_eq!(outcome.source(), "cache");
        assert_eq!(&outcome.response().unwrap().body[..], b"shell");
    }

    #[tokio::test]
    async fn test_offline_uses_exact_entry_without_fallback() {
        let network = ScriptedNetwork::new();
        network.fail(PAGE);
        let (_db, ctx) = context(network.clone(), INDEX).await;
        let request = get(PAGE, RequestMode::Navigate);
        ctx.store
            .put(&request.key(), &response(PAGE, 200, ResponseType::Basic, "old settings"))
            .await
            .unwrap();

        let outcome = execute(Strategy::NetworkFirst, &request, &ctx).await.unwrap();
        assert_eq!(outcome, RequestOutcome::Cache(response(PAGE, 200, ResponseType::Basic, "old settings")));
    }

    #[tokio::test]
    async fn test_offline_and_uncached_is_unavailable() {
        let network = ScriptedNetwork::new();
        network.fail(PAGE);
        let (_db, ctx) = context(network.clone(), INDEX).await;

        let outcome = execute(Strategy::NetworkFirst, &get(PAGE, RequestMode::Navigate), &ctx).await.unwrap();
        assert!(outcome.is_unavailable());
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_order_holds_for_many_pages() {
        let network = ScriptedNetwork::new();
        let (_db, ctx) = context(network.clone(), INDEX).await;

        for i in 0..5 {
            let page = format!("https://app.test/page/{i}");
            network.fail(&page);
            let request = get(&page, RequestMode::Navigate);
            ctx.store
                .put(&request.key(), &response(&page, 200, ResponseType::Basic, "exact"))
                .await
                .unwrap();

            let before = execute(Strategy::NetworkFirst, &request, &ctx).await.unwrap();
            assert_eq!(&before.response().unwrap().body[..], b"exact");
        }

        ctx.store
            .put(&get(INDEX, RequestMode::NoCors).key(), &response(INDEX, 200, ResponseType::Basic, "shell"))
            .await
            .unwrap();

        for i in 0..5 {
            let request = get(&format!("https://app.test/page/{i}"), RequestMode::Navigate);
            let after = execute(Strategy::NetworkFirst, &request, &ctx).await.unwrap();
            assert_eq!(&after.response().unwrap().body[..], b"shell");
        }
    }
}
