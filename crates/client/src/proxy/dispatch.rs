//! Fetch interception: decide whether a request is ours and which strategy
//! answers it.

use serde::Serialize;
use std::sync::Arc;

use swcache_core::{Error, RequestDescriptor, Strategy};

use super::OfflineProxy;
use super::strategy::{self, OfflineFallback, ProxyResponse};

/// Why a request was left to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Bypass {
    /// Not a GET.
    Method,
    /// Path starts with an excluded prefix.
    Excluded,
    /// Browser-extension scheme.
    Scheme,
}

impl OfflineProxy {
    /// The bypass rule a request hits, if any. Checked in order: method,
    /// excluded path prefix, scheme.
    pub fn bypass_reason(&self, request: &RequestDescriptor) -> Option<Bypass> {
        if !request.is_get() {
            return Some(Bypass::Method);
        }

        let path = request.url.path();
        if self.config.excluded_paths.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Some(Bypass::Excluded);
        }

        if self.config.bypass_schemes.iter().any(|scheme| scheme == request.url.scheme()) {
            return Some(Bypass::Scheme);
        }

        None
    }

    /// Handle a fetch event.
    ///
    /// Returns `None` when the request is not intercepted; the host then
    /// performs the plain network fetch itself.
    pub async fn handle_fetch(&self, request: &RequestDescriptor) -> Result<Option<ProxyResponse>, Error> {
        if let Some(reason) = self.bypass_reason(request) {
            tracing::trace!(?reason, "not intercepting {} {}", request.method, request.url);
            return Ok(None);
        }

        let route = self.config.router.classify(&request.url);
        let store = self.db.open_store(self.config.store_name(route.store)).await?;
        tracing::debug!(rule = ?route.rule, strategy = ?route.strategy, store = store.name(), "routing {}", request.url);

        let response = match route.strategy {
            Strategy::CacheFirst => strategy::cache_first(request, &store, self.fetcher.as_ref()).await?,
            Strategy::NetworkFirst => {
                let offline = OfflineFallback { db: &self.db, page: &self.config.offline_page };
                strategy::network_first(request, &store, self.fetcher.as_ref(), offline).await?
            }
            Strategy::StaleWhileRevalidate => {
                strategy::stale_while_revalidate(request, &store, Arc::clone(&self.fetcher), &self.keep_alive).await?
            }
        };

        Ok(Some(response))
    }
}
