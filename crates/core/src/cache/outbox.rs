//! Durable queue of form submissions captured while offline.
//!
//! Entries are appended when a submission cannot reach the network and are
//! removed only after background sync delivers them.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A submission waiting for connectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PendingSubmission {
    pub id: i64,
    pub payload: serde_json::Value,
    pub created_at: String,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl CacheDb {
    /// Queue a submission. Returns its id.
    pub async fn enqueue_submission(&self, payload: &serde_json::Value) -> Result<i64, Error> {
        let payload_json = serde_json::to_string(payload)?;
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO pending_submissions (payload_json, created_at) VALUES (?1, ?2)",
                    params![payload_json, created_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// All pending submissions in arrival order.
    pub async fn pending_submissions(&self) -> Result<Vec<PendingSubmission>, Error> {
        let rows = self
            .conn
            .call(|conn| -> Result<Vec<(i64, String, String, u32, Option<String>)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, payload_json, created_at, attempts, last_error
                     FROM pending_submissions ORDER BY id ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter()
            .map(|(id, payload_json, created_at, attempts, last_error)| {
                Ok(PendingSubmission { id, payload: serde_json::from_str(&payload_json)?, created_at, attempts, last_error })
            })
            .collect()
    }

    /// Remove a delivered submission. Returns false if it was already gone.
    pub async fn remove_submission(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM pending_submissions WHERE id = ?1", params![id])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Record a failed delivery attempt.
    pub async fn record_submission_failure(&self, id: i64, error: &str) -> Result<(), Error> {
        let error = error.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE pending_submissions SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
                    params![id, error],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
