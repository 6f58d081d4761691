//! Control messages posted by pages to the proxy.

use schemars::JsonSchema;
use serde::Serialize;

use super::OfflineProxy;

/// A recognised control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    SkipWaiting,
    ClearCache,
}

impl ControlMessage {
    /// Read `{"type": "SKIP_WAITING" | "CLEAR_CACHE"}`. Anything else is `None`.
    pub fn parse(message: &serde_json::Value) -> Option<Self> {
        match message.get("type")?.as_str()? {
            "SKIP_WAITING" => Some(Self::SkipWaiting),
            "CLEAR_CACHE" => Some(Self::ClearCache),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageOutcome {
    SkipWaiting,
    CacheCleared { deleted: Vec<String> },
    /// Unrecognised shape, or the action failed (logged).
    Ignored,
}

impl OfflineProxy {
    /// Handle a control message.
    pub async fn handle_message(&self, message: &serde_json::Value) -> MessageOutcome {
        match ControlMessage::parse(message) {
            Some(ControlMessage::SkipWaiting) => {
                tracing::info!("skip waiting requested");
                self.registration.skip_waiting();
                MessageOutcome::SkipWaiting
            }
            Some(ControlMessage::ClearCache) => match self.clear_all_stores().await {
                Ok(deleted) => {
                    tracing::info!(deleted = deleted.len(), "all caches cleared");
                    MessageOutcome::CacheCleared { deleted }
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to clear caches");
                    MessageOutcome::Ignored
                }
            },
            None => {
                tracing::debug!("ignoring unrecognised message");
                MessageOutcome::Ignored
            }
        }
    }

    async fn clear_all_stores(&self) -> Result<Vec<String>, swcache_core::Error> {
        let mut deleted = Vec::new();
        for name in self.db.store_names().await? {
            if self.db.delete_store(&name).await? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}
