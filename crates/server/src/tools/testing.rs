//! Fixtures shared by the tool tests.

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

use swcache_client::{Fetcher, OfflineProxy, ProxyConfig};
use swcache_core::{AppConfig, CacheDb, Error, RequestDescriptor, StoredResponse};

pub(crate) const ORIGIN: &str = "https://dharmaputra.example";

/// Replies from a fixed table; anything else fails as unreachable.
#[derive(Default)]
pub(crate) struct TableFetcher {
    replies: Mutex<HashMap<String, StoredResponse>>,
}

impl TableFetcher {
    pub(crate) fn respond(&self, path: &str, response: StoredResponse) {
        self.replies.lock().unwrap().insert(format!("{ORIGIN}{path}"), response);
    }
}

#[async_trait]
impl Fetcher for TableFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<StoredResponse, Error> {
        self.replies
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("unreachable: {}", request.url)))
    }
}

pub(crate) async fn proxy() -> (Arc<OfflineProxy>, Arc<TableFetcher>, CacheDb) {
    let config = AppConfig {
        origin: ORIGIN.into(),
        cache_name: "dpm".into(),
        cache_version: "v1".into(),
        precache: vec!["/".into(), "/offline.html".into()],
        ..Default::default()
    };
    let db = CacheDb::open_in_memory().await.unwrap();
    let fetcher = Arc::new(TableFetcher::default());
    let proxy = OfflineProxy::new(ProxyConfig::from_app(&config).unwrap(), db.clone(), fetcher.clone());
    (Arc::new(proxy), fetcher, db)
}

pub(crate) fn site_url(path: &str) -> Url {
    Url::parse(&format!("{ORIGIN}{path}")).unwrap()
}

/// Parse the JSON text of a successful tool result.
pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
