//! The three caching strategies.
//!
//! Each strategy answers one request from one store. Only `200` responses
//! are written back; a failed write is logged and never fails the request.

use serde::Serialize;
use std::sync::Arc;
use url::Url;

use swcache_core::{CacheDb, CacheStore, Error, RequestDescriptor, ResponseSource, StoredResponse};

use super::keepalive::KeepAlive;
use crate::fetch::Fetcher;

/// A response handed back for an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyResponse {
    pub response: StoredResponse,
    pub source: ResponseSource,
}

impl ProxyResponse {
    fn network(response: StoredResponse) -> Self {
        Self { response, source: ResponseSource::Network }
    }

    fn cached(response: StoredResponse) -> Self {
        Self { response, source: ResponseSource::Cache }
    }
}

/// Where network-first looks when an HTML navigation finds nothing.
#[derive(Debug, Clone, Copy)]
pub struct OfflineFallback<'a> {
    pub db: &'a CacheDb,
    pub page: &'a Url,
}

/// Serve from the store; go to the network only on a miss.
pub async fn cache_first(
    request: &RequestDescriptor, store: &CacheStore, fetcher: &dyn Fetcher,
) -> Result<ProxyResponse, Error> {
    if let Some(cached) = store.match_request(request).await? {
        tracing::debug!("cache hit: {}", request.url);
        return Ok(ProxyResponse::cached(cached));
    }

    tracing::debug!("cache miss, fetching: {}", request.url);
    let response = fetcher.fetch(request).await.inspect_err(|e| {
        tracing::warn!(url = %request.url, error = %e, "cache-first fetch failed with no cached entry");
    })?;

    if response.status == 200 {
        write_back(store, request, &response).await;
    }

    Ok(ProxyResponse::network(response))
}

/// Prefer the network; fall back to the store, then to the offline page.
pub async fn network_first(
    request: &RequestDescriptor, store: &CacheStore, fetcher: &dyn Fetcher, offline: OfflineFallback<'_>,
) -> Result<ProxyResponse, Error> {
    tracing::debug!("network first, fetching: {}", request.url);
    let error = match fetcher.fetch(request).await {
        Ok(response) => {
            if response.status == 200 {
                write_back(store, request, &response).await;
            }
            return Ok(ProxyResponse::network(response));
        }
        Err(e) if e.is_network() => e,
        Err(e) => return Err(e),
    };

    tracing::debug!(error = %error, "network failed, trying cache: {}", request.url);
    if let Some(cached) = store.match_request(request).await? {
        return Ok(ProxyResponse::cached(cached));
    }

    if request.accepts_html() {
        let page_request = RequestDescriptor::get(offline.page.clone());
        return match offline.db.match_any(&page_request).await {
            Ok(Some(page)) => Ok(ProxyResponse { response: page, source: ResponseSource::OfflinePage }),
            Ok(None) => Ok(ProxyResponse { response: StoredResponse::offline(), source: ResponseSource::Synthesized }),
            Err(e) => {
                tracing::warn!(error = %e, "offline page lookup failed");
                Ok(ProxyResponse { response: StoredResponse::offline(), source: ResponseSource::Synthesized })
            }
        };
    }

    Err(Error::Offline(format!("{} not cached: {}", request.url, error)))
}

/// Serve the stored entry at once and refresh it in the background.
///
/// The refresh is spawned on `keep_alive` before the store is consulted. With
/// a stored entry the caller never waits for it; without one the caller gets
/// the refresh result.
pub async fn stale_while_revalidate(
    request: &RequestDescriptor, store: &CacheStore, fetcher: Arc<dyn Fetcher>, keep_alive: &KeepAlive,
) -> Result<ProxyResponse, Error> {
    let revalidation = {
        let request = request.clone();
        let store = store.clone();
        keep_alive.spawn(async move {
            let result = fetcher.fetch(&request).await;
            match &result {
                Ok(response) if response.status == 200 => write_back(&store, &request, response).await,
                Ok(response) => tracing::debug!("revalidation of {} returned {}", request.url, response.status),
                Err(e) => tracing::debug!(error = %e, "revalidation of {} failed", request.url),
            }
            result
        })
    };

    if let Some(cached) = store.match_request(request).await? {
        tracing::debug!("serving stale entry while revalidating: {}", request.url);
        return Ok(ProxyResponse::cached(cached));
    }

    let response = revalidation
        .await
        .map_err(|e| Error::Network(format!("revalidation aborted: {e}")))??;
    Ok(ProxyResponse::network(response))
}

async fn write_back(store: &CacheStore, request: &RequestDescriptor, response: &StoredResponse) {
    if let Err(e) = store.put(request, response).await {
        tracing::warn!(store = store.name(), url = %request.url, error = %e, "failed to cache response");
    }
}
