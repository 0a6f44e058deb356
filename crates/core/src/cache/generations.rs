//! Generation rows and the [`StoreBackend`] implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::entries::GenerationStore;
use crate::Error;
use crate::store::{GenerationTag, OpenedGeneration, PersistedState, StoreBackend};

/// A generation row as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationRecord {
    pub tag: String,
    pub state: String,
    pub created_at: String,
    pub warmed_at: Option<String>,
}

impl CacheDb {
    /// All generation rows, oldest first.
    pub async fn generation_records(&self) -> Result<Vec<GenerationRecord>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationRecord>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT tag, state, created_at, warmed_at FROM generations ORDER BY created_at ASC, tag ASC",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok(GenerationRecord {
                        tag: row.get(0)?,
                        state: row.get(1)?,
                        created_at: row.get(2)?,
                        warmed_at: row.get(3)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl StoreBackend for CacheDb {
    async fn open_generation(&self, tag: &GenerationTag) -> Result<OpenedGeneration, Error> {
        let name = tag.as_str().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let (created, state) = self
            .conn
            .call(move |conn| -> Result<(bool, String), Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO generations (tag, state, created_at) VALUES (?1, 'creating', ?2)",
                    params![name, now],
                )?;
                let state: String =
                    conn.query_row("SELECT state FROM generations WHERE tag = ?1", params![name], |row| row.get(0))?;
                Ok((inserted == 1, state))
            })
            .await
            .map_err(|e| Error::StoreCreate { tag: tag.to_string(), reason: Error::from(e).to_string() })?;

        let state = PersistedState::parse(&state).ok_or_else(|| Error::StoreCreate {
            tag: tag.to_string(),
            reason: format!("unknown persisted state: {state}"),
        })?;

        if created {
            tracing::info!(generation = %tag, "created generation store");
        }

        Ok(OpenedGeneration { store: Arc::new(GenerationStore::new(self.clone(), tag.clone())), state, created })
    }

    async fn mark_warmed(&self, tag: &GenerationTag) -> Result<(), Error> {
        let name = tag.as_str().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE generations SET state = 'warmed', warmed_at = ?2 WHERE tag = ?1",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| Error::StoreWrite(format!("failed to mark {tag} warmed: {}", Error::from(e))))
    }

    async fn list_generations(&self) -> Result<Vec<GenerationTag>, Error> {
        let records = self.generation_records().await?;
        Ok(records.into_iter().map(|r| GenerationTag::new(r.tag)).collect())
    }

    async fn delete_generation(&self, tag: &GenerationTag) -> Result<bool, Error> {
        let name = tag.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE tag = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(|e| Error::GenerationDelete { tag: tag.to_string(), reason: Error::from(e).to_string() })
    }
}
