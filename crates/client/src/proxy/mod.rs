//! Offline cache proxy: the event handlers of one deployed proxy version.
//!
//! ### Events
//! - `install`: precache the static manifest into the versioned static store
//! - `activate`: delete stores from other versions, claim clients
//! - `fetch`: route a request to one of three caching strategies
//! - `sync`: flush queued form submissions
//! - `push` / `notification_click`: notification display and click handling
//! - `message`: `SKIP_WAITING` and `CLEAR_CACHE` control messages
//!
//! ### Stores
//! - `{cache_name}-{cache_version}`: precached static assets and images
//! - `{cache_name}-runtime-{cache_version}`: everything cached while serving

pub mod dispatch;
pub mod keepalive;
pub mod lifecycle;
pub mod message;
pub mod notify;
pub mod strategy;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::Bypass;
pub use keepalive::KeepAlive;
pub use lifecycle::{
    ActivateReport, InstallReport, PrecacheFailure, Registration, RegistrationStatus, WorkerState,
};
pub use message::{ControlMessage, MessageOutcome};
pub use notify::{ClickOutcome, Notification, NotificationAction, NotificationData};
pub use strategy::ProxyResponse;
pub use sync::{SyncFailure, SyncReport};

use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

use swcache_core::config::NotificationTemplate;
use swcache_core::location;
use swcache_core::{AppConfig, CacheDb, Error, PrecachePolicy, RequestDescriptor, Router, StoreKind};

use crate::fetch::Fetcher;

/// Immutable settings of one proxy version, resolved against the origin.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub origin: Url,
    pub static_cache: String,
    pub runtime_cache: String,
    pub precache: Vec<Url>,
    pub precache_policy: PrecachePolicy,
    pub excluded_paths: Vec<String>,
    pub bypass_schemes: Vec<String>,
    pub router: Router,
    pub offline_page: Url,
    pub sync_tag: String,
    pub sync_endpoint: Url,
    pub notification: NotificationTemplate,
}

impl ProxyConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = location::resolve(&config.origin, None).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resolve = |input: &str| {
            location::resolve(input, Some(&origin)).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
        };

        let precache = config.precache.iter().map(|path| resolve(path)).collect::<Result<Vec<_>, _>>()?;
        let offline_page = resolve(&config.offline_page)?;
        let sync_endpoint = resolve(&config.sync_endpoint)?;
        let router =
            Router::new(&config.patterns).map_err(|e| Error::InvalidInput(format!("bad route pattern: {e}")))?;

        Ok(Self {
            static_cache: config.static_cache_name(),
            runtime_cache: config.runtime_cache_name(),
            precache,
            precache_policy: config.precache_policy,
            excluded_paths: config.excluded_paths.clone(),
            bypass_schemes: config.bypass_schemes.clone(),
            router,
            offline_page,
            sync_tag: config.sync_tag.clone(),
            sync_endpoint,
            notification: config.notification.clone(),
            origin,
        })
    }

    /// Name of the store a route writes to.
    pub fn store_name(&self, kind: StoreKind) -> &str {
        match kind {
            StoreKind::Static => &self.static_cache,
            StoreKind::Runtime => &self.runtime_cache,
        }
    }
}

/// One proxy version bound to its stores and network.
pub struct OfflineProxy {
    config: Arc<ProxyConfig>,
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    registration: Registration,
    keep_alive: KeepAlive,
}

impl OfflineProxy {
    pub fn new(config: ProxyConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            config: Arc::new(config),
            db,
            fetcher,
            registration: Registration::default(),
            keep_alive: KeepAlive::new(),
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Work started on behalf of an event that may outlive its response.
    pub fn keep_alive(&self) -> &KeepAlive {
        &self.keep_alive
    }
}

/// The events a host delivers to a proxy version.
#[async_trait]
pub trait WorkerEvents: Send + Sync {
    async fn install(&self) -> InstallReport;

    async fn activate(&self) -> ActivateReport;

    /// `None` leaves the request to the host's own network fetch.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Option<ProxyResponse>, Error>;

    /// `None` when the tag is not ours.
    async fn sync(&self, tag: &str) -> Option<SyncReport>;

    fn push(&self, payload: Option<&str>) -> Notification;

    fn notification_click(&self, action: Option<&str>) -> ClickOutcome;

    async fn message(&self, message: &serde_json::Value) -> MessageOutcome;
}

#[async_trait]
impl WorkerEvents for OfflineProxy {
    async fn install(&self) -> InstallReport {
        OfflineProxy::install(self).await
    }

    async fn activate(&self) -> ActivateReport {
        OfflineProxy::activate(self).await
    }

    async fn fetch(&self, request: &RequestDescriptor) -> Result<Option<ProxyResponse>, Error> {
        self.handle_fetch(request).await
    }

    async fn sync(&self, tag: &str) -> Option<SyncReport> {
        self.handle_sync(tag).await
    }

    fn push(&self, payload: Option<&str>) -> Notification {
        self.build_notification(payload)
    }

    fn notification_click(&self, action: Option<&str>) -> ClickOutcome {
        self.click_outcome(action)
    }

    async fn message(&self, message: &serde_json::Value) -> MessageOutcome {
        self.handle_message(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::testing::{ORIGIN, ScriptedFetcher, app_config, get, html, site_url};

    #[test]
    fn test_proxy_config_resolves_paths_against_origin() {
        let config = ProxyConfig::from_app(&app_config()).unwrap();
        assert_eq!(config.static_cache, "dpm-v1");
        assert_eq!(config.runtime_cache, "dpm-runtime-v1");
        assert_eq!(config.precache.len(), 8);
        assert_eq!(config.precache[0].as_str(), format!("{ORIGIN}/"));
        assert_eq!(config.offline_page.as_str(), site_url("/offline.html"));
        assert_eq!(config.sync_endpoint.as_str(), site_url("/api/contact"));
        assert_eq!(config.store_name(StoreKind::Static), "dpm-v1");
        assert_eq!(config.store_name(StoreKind::Runtime), "dpm-runtime-v1");
    }

    #[test]
    fn test_proxy_config_rejects_bad_pattern() {
        let mut app = app_config();
        app.patterns.api = "(".into();
        assert!(matches!(ProxyConfig::from_app(&app), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_proxy_config_rejects_relative_origin() {
        let app = AppConfig { origin: "localhost".into(), ..app_config() };
        assert!(matches!(ProxyConfig::from_app(&app), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_events_through_trait_object() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond(&site_url("/"), html("home"));
        let app = AppConfig { precache: vec!["/".into()], ..app_config() };
        let proxy = OfflineProxy::new(ProxyConfig::from_app(&app).unwrap(), db, fetcher.clone());
        let events: &dyn WorkerEvents = &proxy;

        assert!(events.install().await.complete);
        assert!(events.activate().await.clients_claimed);

        let response = events.fetch(&get("/")).await.unwrap().unwrap();
        assert_eq!(response.response.body, b"home");
        assert!(events.sync("periodic-refresh").await.is_none());
        assert_eq!(events.push(None).body, app.notification.default_body);

        proxy.keep_alive().settle().await;
    }
}
