//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CacheListParams, CachePurgeParams, get_impl, list_impl, purge_impl};
use crate::tools::events::{
    MessageParams, NotificationClickParams, PushParams, QueueSubmissionParams, SyncParams, message_impl,
    notification_click_impl, push_impl, queue_submission_impl, sync_impl,
};
use crate::tools::fetch::{FetchParams, fetch_impl};
use crate::tools::lifecycle::{InstallParams, activate_impl, install_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_client::OfflineProxy;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct SwCacheServer {
    proxy: Arc<OfflineProxy>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around one proxy version.
    pub fn new(proxy: Arc<OfflineProxy>) -> Self {
        Self { proxy, tool_router: Self::tool_router() }
    }

    #[tool(description = "Deliver the install event: precache the static manifest, then activate unless told not to.")]
    async fn sw_install(&self, params: Parameters<InstallParams>) -> Result<CallToolResult, McpError> {
        install_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Deliver the activate event: delete stores from other versions and claim clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.proxy).await
    }

    /// Intercept a request.
    ///
    /// Requests the proxy does not handle are fetched directly and reported
    /// with the bypass reason.
    #[tool(description = "Deliver a fetch event. Returns the response and whether it came from the network, a cache store, the offline page or a synthesized 503.")]
    async fn sw_fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Deliver a background sync event. The form sync tag flushes queued submissions to the sync endpoint.")]
    async fn sw_sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Queue a JSON form submission for delivery on the next background sync.")]
    async fn sw_queue_submission(&self, params: Parameters<QueueSubmissionParams>) -> Result<CallToolResult, McpError> {
        queue_submission_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Deliver a push event. Returns the notification to display.")]
    async fn sw_push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.proxy, params.0)
    }

    #[tool(description = "Deliver a notification click. The explore action opens the site; anything else dismisses.")]
    async fn sw_notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.proxy, params.0)
    }

    #[tool(description = "Post a control message: {\"type\": \"SKIP_WAITING\"} or {\"type\": \"CLEAR_CACHE\"}.")]
    async fn sw_message(&self, params: Parameters<MessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.proxy, params.0).await
    }

    #[tool(description = "List cache stores with entry counts, or the entries of one store.")]
    async fn cache_list(&self, params: Parameters<CacheListParams>) -> Result<CallToolResult, McpError> {
        list_impl(self.proxy.db(), params.0).await
    }

    #[tool(description = "Get the stored response for a URL from one store or any store.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.proxy.db(), &self.proxy.config().origin, params.0).await
    }

    #[tool(description = "Delete a cache store, or only its entries under a URL prefix.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.proxy.db(), params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
