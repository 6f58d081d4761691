//! Auxiliary event tools: background sync, push, notification click and
//! control messages.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_client::proxy::SyncReport;
use swcache_client::{OfflineProxy, WorkerEvents};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync tag (default: the configured form sync tag).
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SyncOutput {
    pub tag: String,
    /// False when the tag is not handled by the proxy.
    pub handled: bool,
    pub report: Option<SyncReport>,
}

/// Parameters for the sw_queue_submission tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueueSubmissionParams {
    /// JSON body to POST to the sync endpoint on the next sync.
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueueSubmissionOutput {
    pub id: i64,
    pub pending: usize,
}

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Push payload text; the default body is used when absent.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Action button clicked, or none for the notification body.
    #[serde(default)]
    pub action: Option<String>,
}

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageParams {
    /// Message object, e.g. `{"type": "CLEAR_CACHE"}`.
    pub message: serde_json::Value,
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(proxy: &OfflineProxy, params: SyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.unwrap_or_else(|| proxy.config().sync_tag.clone());
    let report = WorkerEvents::sync(proxy, &tag).await;
    json_result(&SyncOutput { tag, handled: report.is_some(), report })
}

/// Implementation of the sw_queue_submission tool.
pub async fn queue_submission_impl(
    proxy: &OfflineProxy, params: QueueSubmissionParams,
) -> Result<CallToolResult, McpError> {
    if params.payload.is_null() {
        return Err(ToolError::InvalidInput("payload cannot be null".into()).into());
    }

    let id = proxy.queue_submission(&params.payload).await?;
    let pending = proxy.db().pending_submissions().await?.len();
    json_result(&QueueSubmissionOutput { id, pending })
}

/// Implementation of the sw_push tool.
pub fn push_impl(proxy: &OfflineProxy, params: PushParams) -> Result<CallToolResult, McpError> {
    json_result(&proxy.push(params.payload.as_deref()))
}

/// Implementation of the sw_notification_click tool.
pub fn notification_click_impl(
    proxy: &OfflineProxy, params: NotificationClickParams,
) -> Result<CallToolResult, McpError> {
    json_result(&proxy.notification_click(params.action.as_deref()))
}

/// Implementation of the sw_message tool.
pub async fn message_impl(proxy: &OfflineProxy, params: MessageParams) -> Result<CallToolResult, McpError> {
    json_result(&proxy.message(&params.message).await)
}
