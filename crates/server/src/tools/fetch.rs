//! sw_fetch tool implementation.
//!
//! Delivers a fetch event. Requests the proxy does not intercept are sent
//! straight to the network, as a browser would.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use swcache_client::{Bypass, Fetcher, OfflineProxy, WorkerEvents};
use swcache_core::{RequestDescriptor, ResponseSource, StoredResponse};

use super::{body_text, json_result};

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path resolved against the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers, e.g. `{"accept": "text/html"}`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body as text.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FetchOutput {
    pub url: String,
    /// The proxy answered the request.
    pub intercepted: bool,
    /// Why the request was left to the network.
    pub bypass: Option<Bypass>,
    pub source: ResponseSource,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub body_len: usize,
}

impl FetchOutput {
    fn new(url: String, response: StoredResponse, source: ResponseSource, bypass: Option<Bypass>) -> Self {
        Self {
            url,
            intercepted: bypass.is_none(),
            bypass,
            source,
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body_len: response.body.len(),
            body: body_text(&response.body),
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(proxy: &OfflineProxy, params: FetchParams) -> Result<CallToolResult, McpError> {
    let mut request = RequestDescriptor::parse(&params.method, &params.url, Some(&proxy.config().origin))?;
    for (name, value) in &params.headers {
        request = request.with_header(name, value);
    }
    if let Some(body) = params.body {
        request = request.with_body(body.into_bytes());
    }

    let url = request.url.to_string();
    let output = match WorkerEvents::fetch(proxy, &request).await? {
        Some(answer) => FetchOutput::new(url, answer.response, answer.source, None),
        None => {
            let bypass = proxy.bypass_reason(&request);
            let response = proxy.fetcher().fetch(&request).await?;
            FetchOutput::new(url, response, ResponseSource::Network, bypass)
        }
    };

    json_result(&output)
}
