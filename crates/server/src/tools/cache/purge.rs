//! cache_purge tool implementation.
//!
//! Deletes a whole store, or the entries of a store under a URL prefix.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::CacheDb;

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Store to purge.
    pub store: String,

    /// Only delete entries whose URL starts with this prefix.
    #[serde(default)]
    pub url_prefix: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of entries deleted.
    pub deleted: u64,
    /// The store itself was removed.
    pub store_deleted: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.store.trim().is_empty() {
        return Err(ToolError::InvalidInput("store cannot be empty".to_string()).into());
    }

    if !cache.has_store(&params.store).await? {
        return json_result(&CachePurgeOutput { deleted: 0, store_deleted: false });
    }

    let store = cache.open_store(&params.store).await?;
    let output = match params.url_prefix.as_deref() {
        Some(prefix) => CachePurgeOutput { deleted: store.purge_prefix(prefix).await?, store_deleted: false },
        None => {
            let deleted = store.len().await?;
            let store_deleted = cache.delete_store(&params.store).await?;
            CachePurgeOutput { deleted, store_deleted }
        }
    };

    tracing::info!(store = %params.store, deleted = output.deleted, "cache purged");
    json_result(&output)
}
