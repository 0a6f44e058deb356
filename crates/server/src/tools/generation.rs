//! generation_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use cachegate_core::CacheDb;
use cachegate_core::cache::GenerationRecord;
use cachegate_engine::ProxyEngine;

use super::json_result;

/// Output structure for generation_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerationStatusOutput {
    /// Tag of the generation this process serves.
    pub current: String,
    /// Lifecycle state of the current generation.
    pub state: String,
    /// Whether stale generations have been collected.
    pub activated: bool,
    /// Entries stored in the current generation.
    pub entries: u64,
    /// Background writes not yet finished.
    pub pending_tasks: usize,
    /// Every generation persisted in the database.
    pub generations: Vec<GenerationRecord>,
}

/// Implementation of the generation_status tool.
pub async fn status_impl(engine: &ProxyEngine, db: &CacheDb) -> Result<CallToolResult, McpError> {
    let current = engine.generation_tag();
    let state = serde_json::to_value(engine.generation_state())
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let output = GenerationStatusOutput {
        current: current.to_string(),
        state,
        activated: engine.is_activated(),
        entries: db.entry_count(current).await?,
        pending_tasks: engine.pending_tasks(),
        generations: db.generation_records().await?,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{CannedNetwork, output, started_engine};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_status_after_start() {
        let network = Arc::new(CannedNetwork::default());
        network.serve("https://app.test/index.html", 200, "shell");
        let (db, engine) = started_engine(network).await;

        let result = status_impl(&engine, &db).await.unwrap();
        let out: GenerationStatusOutput = output(&result);

        assert_eq!(out.current, "v1");
        assert_eq!(out.state, "warmed");
        assert!(out.activated);
        assert_eq!(out.entries, 1);
        assert_eq!(out.generations.len(), 1);
        assert_eq!(out.generations[0].state, "warmed");
    }
}
