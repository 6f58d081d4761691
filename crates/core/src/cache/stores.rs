//! Store-level operations: open, enumerate, delete, match across stores.

use super::connection::CacheDb;
use super::entries::{CacheStore, EntryRow};
use super::hash::compute_cache_key;
use crate::Error;
use crate::request::{RequestDescriptor, StoredResponse};
use tokio_rusqlite::params;

impl CacheDb {
    /// Open a named store, creating it if it doesn't exist.
    pub async fn open_store(&self, name: &str) -> Result<CacheStore, Error> {
        let store_name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
                    params![store_name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(CacheStore::new(self.clone(), name))
    }

    /// Names of every existing store, oldest first.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and all of its entries.
    ///
    /// Returns false if no store had that name.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE store_name = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up in every store, oldest store first.
    pub async fn match_any(&self, request: &RequestDescriptor) -> Result<Option<StoredResponse>, Error> {
        let key_hash = compute_cache_key(&request.method, request.url.as_str());
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.vary_json, e.status, e.status_text, e.headers_json, e.body
                     FROM cache_entries e JOIN cache_stores s ON s.name = e.store_name
                     WHERE e.key_hash = ?1
                     ORDER BY s.created_at ASC, s.name ASC",
                )?;
                let rows = stmt
                    .query_map(params![key_hash], EntryRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        for row in rows {
            if let Some(response) = row.into_response_for(request)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}
