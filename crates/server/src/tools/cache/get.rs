//! cache_get tool implementation.
//!
//! Retrieves the stored response for a URL.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;
use swcache_core::{CacheDb, Error, RequestDescriptor};

use crate::tools::{body_text, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the site origin.
    pub url: String,

    /// Look only in this store (default: every store, oldest first).
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub body_len: usize,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, origin: &Url, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let request = RequestDescriptor::parse("GET", &params.url, Some(origin))?;

    let found = match &params.store {
        Some(name) => cache.open_store(name).await?.match_request(&request).await?,
        None => cache.match_any(&request).await?,
    };
    let response = found.ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;

    let output = CacheGetOutput {
        url: request.url.to_string(),
        status: response.status,
        status_text: response.status_text,
        headers: response.headers,
        body_len: response.body.len(),
        body: body_text(&response.body),
    };

    json_result(&output)
}
