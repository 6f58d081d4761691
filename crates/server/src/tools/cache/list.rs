//! cache_list tool implementation.
//!
//! Lists the named stores, or the entries of one store.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{CacheDb, EntrySummary, Error};

use crate::tools::json_result;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// List the entries of this store instead of the stores.
    #[serde(default)]
    pub store: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: u64,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CacheListOutput {
    Stores { stores: Vec<StoreSummary> },
    Entries { store: String, entries: Vec<EntrySummary> },
}

/// Implementation of the cache_list tool.
pub async fn list_impl(cache: &CacheDb, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let output = match params.store {
        Some(name) => {
            if !cache.has_store(&name).await? {
                return Err(Error::CacheMiss(format!("no store named {name}")).into());
            }
            let entries = cache.open_store(&name).await?.entries().await?;
            CacheListOutput::Entries { store: name, entries }
        }
        None => {
            let mut stores = Vec::new();
            for name in cache.store_names().await? {
                let entries = cache.open_store(&name).await?.len().await?;
                stores.push(StoreSummary { name, entries });
            }
            CacheListOutput::Stores { stores }
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{output, site_url};
    use swcache_core::{RequestDescriptor, StoredResponse};

    #[tokio::test]
    async fn test_list_stores_and_entries() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let store = cache.open_store("dpm-v1").await.unwrap();
        store
            .put(&RequestDescriptor::get(site_url("/favicon.svg")), &StoredResponse::new(200, "<svg/>"))
            .await
            .unwrap();
        cache.open_store("dpm-runtime-v1").await.unwrap();

        let out = output(&list_impl(&cache, CacheListParams { store: None }).await.unwrap());
        let stores = out["stores"].as_array().unwrap();
        assert_eq!(stores.len(), 2);
        let precache = stores.iter().find(|s| s["name"] == "dpm-v1").unwrap();
        assert_eq!(precache["entries"], 1);

        let out = output(&list_impl(&cache, CacheListParams { store: Some("dpm-v1".into()) }).await.unwrap());
        assert_eq!(out["entries"][0]["url"], "https://dharmaputra.example/favicon.svg");
    }

    #[tokio::test]
    async fn test_list_unknown_store() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        assert!(list_impl(&cache, CacheListParams { store: Some("nope".into()) }).await.is_err());
    }
}
