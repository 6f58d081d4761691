//! Background sync: deliver form submissions queued while offline.

use schemars::JsonSchema;
use serde::Serialize;

use swcache_core::{Error, PendingSubmission, RequestDescriptor};

use super::OfflineProxy;

/// A submission that stayed queued after a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SyncFailure {
    pub id: i64,
    pub reason: String,
}

/// Outcome of one background sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct SyncReport {
    pub tag: String,
    /// Ids delivered and removed from the queue.
    pub sent: Vec<i64>,
    pub failed: Vec<SyncFailure>,
    /// Queue length after the run.
    pub remaining: usize,
    /// Set when the queue itself could not be read.
    pub error: Option<String>,
}

impl OfflineProxy {
    /// Queue a submission for the next sync run.
    pub async fn queue_submission(&self, payload: &serde_json::Value) -> Result<i64, Error> {
        let id = self.db.enqueue_submission(payload).await?;
        tracing::info!(id, tag = %self.config.sync_tag, "submission queued for background sync");
        Ok(id)
    }

    /// Handle a sync event. Tags other than the configured one are ignored.
    pub async fn handle_sync(&self, tag: &str) -> Option<SyncReport> {
        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring sync event");
            return None;
        }

        tracing::info!(tag, "background sync triggered");
        let mut report =
            SyncReport { tag: tag.to_string(), sent: Vec::new(), failed: Vec::new(), remaining: 0, error: None };

        match self.db.pending_submissions().await {
            Ok(pending) => {
                for submission in pending {
                    self.deliver(submission, &mut report).await;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to read pending submissions");
                report.error = Some(e.to_string());
            }
        }

        match self.db.pending_submissions().await {
            Ok(left) => report.remaining = left.len(),
            Err(e) => tracing::warn!(error = %e, "failed to count pending submissions"),
        }

        tracing::info!(sent = report.sent.len(), failed = report.failed.len(), "background sync finished");
        Some(report)
    }

    async fn deliver(&self, submission: PendingSubmission, report: &mut SyncReport) {
        let id = submission.id;
        let outcome = match self.post(&submission.payload).await {
            Ok(status) if (200..300).contains(&status) => self.db.remove_submission(id).await.map(|_| None),
            Ok(status) => Ok(Some(format!("endpoint returned {status}"))),
            Err(e) => Ok(Some(e.to_string())),
        };

        let reason = match outcome {
            Ok(None) => {
                tracing::debug!(id, "submission delivered");
                report.sent.push(id);
                return;
            }
            Ok(Some(reason)) => reason,
            Err(e) => e.to_string(),
        };

        tracing::warn!(id, reason = %reason, "submission not delivered");
        if let Err(e) = self.db.record_submission_failure(id, &reason).await {
            tracing::warn!(id, error = %e, "failed to record delivery attempt");
        }
        report.failed.push(SyncFailure { id, reason });
    }

    async fn post(&self, payload: &serde_json::Value) -> Result<u16, Error> {
        let body = serde_json::to_vec(payload).map_err(|e| Error::InvalidInput(format!("unserializable payload: {e}")))?;
        let request = RequestDescriptor {
            method: "POST".into(),
            url: self.config.sync_endpoint.clone(),
            headers: Vec::new(),
            body: None,
        }
        .with_header("content-type", "application/json")
        .with_body(body);

        let response = self.fetcher.fetch(&request).await?;
        Ok(response.status)
    }
}
