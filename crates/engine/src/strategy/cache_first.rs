//! Cache first, fill the store on a miss.

use cachegate_core::{Error, Request};

use super::{RequestOutcome, StrategyContext, lookup_or_miss, put_logged};

pub(super) async fn run(request: &Request, ctx: &StrategyContext) -> Result<RequestOutcome, Error> {
    let key = request.key();

    if let Some(hit) = lookup_or_miss(ctx.store.as_ref(), &key).await {
        tracing::debug!(key = %key, "cache hit");
        return Ok(RequestOutcome::Cache(hit.response));
    }

    tracing::debug!(key = %key, "cache miss, fetching");
    let response = ctx.network.fetch(request).await?;

    if response.is_ok() {
        put_logged(ctx.store.as_ref(), &key, &response.duplicate()).await;
    }

    Ok(RequestOutcome::Network(response))
}
