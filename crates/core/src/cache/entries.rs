//! Entry operations within a single generation.
//!
//! A [`GenerationStore`] is the [`CacheStore`] handed to strategies. It is a
//! cheap clone of the database handle pinned to one generation tag.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

use super::connection::CacheDb;
use crate::Error;
use crate::http::{CachedResponse, RequestKey, Response, ResponseType};
use crate::store::{CacheStore, GenerationTag};

/// Entry metadata without the body, for inspection.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub response_type: String,
    pub body_bytes: usize,
    pub stored_at: String,
}

/// Store for one generation.
#[derive(Clone, Debug)]
pub struct GenerationStore {
    db: CacheDb,
    tag: GenerationTag,
}

impl GenerationStore {
    pub(crate) fn new(db: CacheDb, tag: GenerationTag) -> Self {
        Self { db, tag }
    }
}

#[async_trait]
impl CacheStore for GenerationStore {
    fn generation(&self) -> &GenerationTag {
        &self.tag
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        self.db.get_entry(&self.tag, key).await
    }

    async fn put(&self, key: &RequestKey, response: &Response) -> Result<(), Error> {
        self.db
            .upsert_entry(&self.tag, key, response)
            .await
            .map_err(|e| Error::StoreWrite(format!("{key} in {}: {e}", self.tag)))
    }

    async fn delete(&self, key: &RequestKey) -> Result<bool, Error> {
        self.db.delete_entry(&self.tag, key).await
    }
}

impl CacheDb {
    /// Insert or replace an entry.
    ///
    /// Fails when the generation row does not exist, so a write racing a
    /// generation delete never resurrects it.
    pub async fn upsert_entry(&self, tag: &GenerationTag, key: &RequestKey, response: &Response) -> Result<(), Error> {
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::StoreWrite(format!("failed to encode headers: {e}")))?;
        let generation = tag.as_str().to_string();
        let key_hash = key.hash().to_string();
        let method = key.method.clone();
        let url = key.url.to_string();
        let status = response.status;
        let response_type = response.response_type.as_str();
        let body = response.body.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (
                        generation, key_hash, method, url, status,
                        response_type, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(generation, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        response_type = excluded.response_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![generation, key_hash, method, url, status, response_type, headers_json, body, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get an entry by key. Returns None if absent.
    pub async fn get_entry(&self, tag: &GenerationTag, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let generation = tag.as_str().to_string();
        let key_hash = key.hash().to_string();

        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, response_type, headers_json, body, stored_at
                     FROM entries WHERE generation = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![generation, key_hash], |row| {
                    Ok(EntryRow {
                        url: row.get(0)?,
                        status: row.get(1)?,
                        response_type: row.get(2)?,
                        headers_json: row.get(3)?,
                        body: row.get(4)?,
                        stored_at: row.get(5)?,
                    })
                });

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_cached).transpose()
    }

    /// Delete one entry. Returns whether a row was removed.
    pub async fn delete_entry(&self, tag: &GenerationTag, key: &RequestKey) -> Result<bool, Error> {
        let generation = tag.as_str().to_string();
        let key_hash = key.hash().to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE generation = ?1 AND key_hash = ?2",
                    params![generation, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a generation.
    pub async fn entry_count(&self, tag: &GenerationTag) -> Result<u64, Error> {
        let generation = tag.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry metadata for a generation, ordered by URL.
    pub async fn list_entries(&self, tag: &GenerationTag) -> Result<Vec<EntrySummary>, Error> {
        let generation = tag.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, response_type, length(body), stored_at
                     FROM entries WHERE generation = ?1 ORDER BY url ASC",
                )?;
                let rows = stmt.query_map(params![generation], |row| {
                    Ok(EntrySummary {
                        method: row.get(0)?,
                        url: row.get(1)?,
                        status: row.get(2)?,
                        response_type: row.get(3)?,
                        body_bytes: row.get::<_, i64>(4)? as usize,
                        stored_at: row.get(5)?,
                    })
                })?;
                let entries = rows.collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}

struct EntryRow {
    url: String,
    status: u16,
    response_type: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn into_cached(self) -> Result<CachedResponse, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::InvalidUrl(format!("stored entry url {}: {e}", self.url)))?;
        let response_type = ResponseType::parse(&self.response_type)
            .ok_or_else(|| Error::InvalidInput(format!("unknown stored response type: {}", self.response_type)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::InvalidInput(format!("corrupt stored headers: {e}")))?;

        Ok(CachedResponse {
            response: Response { url, status: self.status, response_type, headers, body: Bytes::from(self.body) },
            stored_at: self.stored_at,
        })
    }
}
