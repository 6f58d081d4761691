//! Entry operations within one named store.
//!
//! Entries are keyed by the normalized request URL. The request header values
//! named by the response's `Vary` header are recorded at put time and must be
//! equal on lookup for the entry to match.

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use crate::request::{RequestDescriptor, StoredResponse};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Request header values recorded for `Vary` matching.
type VaryPairs = Vec<(String, Option<String>)>;

/// Listing view of one stored entry.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_len: usize,
    pub stored_at: String,
}

/// Handle to one named store.
#[derive(Debug, Clone)]
pub struct CacheStore {
    db: CacheDb,
    name: String,
}

/// Raw row shared by single-store and cross-store lookups.
pub(crate) struct EntryRow {
    vary_json: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            vary_json: row.get(0)?,
            status: row.get(1)?,
            status_text: row.get(2)?,
            headers_json: row.get(3)?,
            body: row.get(4)?,
        })
    }

    /// Decode the row if its recorded `Vary` values agree with `request`.
    pub(crate) fn into_response_for(self, request: &RequestDescriptor) -> Result<Option<StoredResponse>, Error> {
        let vary: VaryPairs = serde_json::from_str(&self.vary_json)?;
        let matches = vary
            .iter()
            .all(|(name, value)| request.header(name) == value.as_deref());
        if !matches {
            return Ok(None);
        }

        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        Ok(Some(StoredResponse { status: self.status, status_text: self.status_text, headers, body: self.body }))
    }
}

/// A validated row ready to be written.
struct NewEntry {
    key_hash: String,
    url: String,
    vary_json: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl NewEntry {
    fn prepare(request: &RequestDescriptor, response: &StoredResponse) -> Result<Self, Error> {
        if !request.is_get() {
            return Err(Error::InvalidInput(format!("cannot cache {} request", request.method)));
        }

        let vary_names = response.vary();
        if vary_names.iter().any(|name| name == "*") {
            return Err(Error::InvalidInput("response has Vary: *".into()));
        }
        let vary: VaryPairs = vary_names
            .into_iter()
            .map(|name| {
                let value = request.header(&name).map(str::to_string);
                (name, value)
            })
            .collect();

        Ok(Self {
            key_hash: compute_cache_key(&request.method, request.url.as_str()),
            url: request.url.to_string(),
            vary_json: serde_json::to_string(&vary)?,
            status: response.status,
            status_text: response.status_text.clone(),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.clone(),
        })
    }
}

impl CacheStore {
    pub(crate) fn new(db: CacheDb, name: &str) -> Self {
        Self { db, name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a request in this store.
    ///
    /// Returns None if there is no entry or its `Vary` values differ.
    pub async fn match_request(&self, request: &RequestDescriptor) -> Result<Option<StoredResponse>, Error> {
        let store_name = self.name.clone();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        let row = self
            .db
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT vary_json, status, status_text, headers_json, body
                     FROM cache_entries WHERE store_name = ?1 AND key_hash = ?2",
                )?;

                match stmt.query_row(params![store_name, key_hash], EntryRow::from_row) {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        match row {
            Some(row) => row.into_response_for(request),
            None => Ok(None),
        }
    }

    /// Whether `put` would accept this pair. Nothing is written.
    pub fn check_cacheable(request: &RequestDescriptor, response: &StoredResponse) -> Result<(), Error> {
        NewEntry::prepare(request, response).map(|_| ())
    }

    /// Insert or replace the entry for a request.
    ///
    /// Only GET requests can be stored, and a response with `Vary: *` is
    /// rejected. The whole row is replaced, so concurrent writers to the same
    /// key leave exactly one of their snapshots behind.
    pub async fn put(&self, request: &RequestDescriptor, response: &StoredResponse) -> Result<(), Error> {
        self.put_all(&[(request.clone(), response.clone())]).await
    }

    /// Insert or replace several entries in one transaction.
    ///
    /// Every pair is checked first; if any is rejected or a write fails,
    /// the store is left as it was.
    pub async fn put_all(&self, entries: &[(RequestDescriptor, StoredResponse)]) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(request, response)| NewEntry::prepare(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        if rows.is_empty() {
            return Ok(());
        }

        let store_name = self.name.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![store_name, now],
                )?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO cache_entries (
                            store_name, key_hash, url, vary_json, status, status_text, headers_json, body, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                        ON CONFLICT(store_name, key_hash) DO UPDATE SET
                            url = excluded.url,
                            vary_json = excluded.vary_json,
                            status = excluded.status,
                            status_text = excluded.status_text,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            stored_at = excluded.stored_at",
                    )?;
                    for row in &rows {
                        stmt.execute(params![
                            store_name,
                            row.key_hash,
                            row.url,
                            row.vary_json,
                            row.status,
                            row.status_text,
                            row.headers_json,
                            row.body,
                            now,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for a request. Returns false if there was none.
    pub async fn delete(&self, request: &RequestDescriptor) -> Result<bool, Error> {
        let store_name = self.name.clone();
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        self.db
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE store_name = ?1 AND key_hash = ?2",
                    params![store_name, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// List entries, oldest write first.
    pub async fn entries(&self) -> Result<Vec<EntrySummary>, Error> {
        let store_name = self.name.clone();
        let rows = self
            .db
            .conn
            .call(move |conn| -> Result<Vec<(String, u16, String, i64, String)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, headers_json, length(body), stored_at
                     FROM cache_entries WHERE store_name = ?1 ORDER BY stored_at ASC",
                )?;
                let rows = stmt
                    .query_map(params![store_name], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(url, status, headers_json, body_len, stored_at)| {
                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
                let content_type = headers
                    .iter()
                    .find(|(n, _)| n == "content-type")
                    .map(|(_, v)| v.clone());
                Ok(EntrySummary { url, status, content_type, body_len: body_len as usize, stored_at })
            })
            .collect()
    }

    pub async fn len(&self) -> Result<u64, Error> {
        let store_name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE store_name = ?1",
                    params![store_name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }

    /// Delete entries whose URL starts with `prefix`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_prefix(&self, prefix: &str) -> Result<u64, Error> {
        let store_name = self.name.clone();
        let pattern = format!("{}%", prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
        self.db
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE store_name = ?1 AND url LIKE ?2 ESCAPE '\\'",
                    params![store_name, pattern],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
