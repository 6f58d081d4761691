//! Install and activate: versioned store management across deployments.
//!
//! Install fills the static store from the manifest and asks to skip the
//! waiting phase. Activate deletes every store that does not belong to the
//! current version and claims open clients. Neither ever fails towards the
//! host; failures are logged and returned in the report.

use futures_util::future::join_all;
use schemars::JsonSchema;
use serde::Serialize;
use std::sync::Mutex;

use swcache_core::{CacheStore, Error, PrecachePolicy, RequestDescriptor, StoredResponse};

use super::OfflineProxy;

/// Position of this proxy version in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install could not reach the store; this version never activates.
    Redundant,
}

/// Point-in-time view of the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct RegistrationStatus {
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub clients_claimed: bool,
}

/// Lifecycle flags shared by the event handlers.
#[derive(Debug)]
pub struct Registration {
    inner: Mutex<RegistrationStatus>,
}

impl Default for Registration {
    fn default() -> Self {
        Self {
            inner: Mutex::new(RegistrationStatus {
                state: WorkerState::Parsed,
                skip_waiting: false,
                clients_claimed: false,
            }),
        }
    }
}

impl Registration {
    pub fn status(&self) -> RegistrationStatus {
        *self.lock()
    }

    pub fn state(&self) -> WorkerState {
        self.lock().state
    }

    /// Skip the grace period that waits for old instances to close.
    pub fn skip_waiting(&self) {
        self.lock().skip_waiting = true;
    }

    /// An installed version may activate once it asked to skip waiting.
    pub fn may_activate(&self) -> bool {
        let status = self.lock();
        status.state == WorkerState::Installed && status.skip_waiting
    }

    /// Move an activatable version to `Activating`, or report the state
    /// that prevents it. Check and transition happen under one lock.
    fn begin_activation(&self) -> Result<(), WorkerState> {
        let mut status = self.lock();
        if status.state != WorkerState::Installed || !status.skip_waiting {
            return Err(status.state);
        }
        status.state = WorkerState::Activating;
        Ok(())
    }

    fn set_state(&self, state: WorkerState) {
        tracing::debug!(?state, "lifecycle transition");
        self.lock().state = state;
    }

    fn claim_clients(&self) {
        self.lock().clients_claimed = true;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistrationStatus> {
        // Fields are plain flags, so a poisoned guard is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A manifest entry that could not be precached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PrecacheFailure {
    pub url: String,
    pub reason: String,
}

/// Outcome of the install event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct InstallReport {
    pub cache: String,
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
    /// Every manifest entry is in the store.
    pub complete: bool,
    pub error: Option<String>,
}

/// Outcome of the activate event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub clients_claimed: bool,
    /// The version was not in a state that may activate.
    pub refused: bool,
    pub error: Option<String>,
}

impl OfflineProxy {
    /// Handle the install event.
    pub async fn install(&self) -> InstallReport {
        self.registration.set_state(WorkerState::Installing);
        let cache = self.config.static_cache.clone();
        tracing::info!(cache = %cache, assets = self.config.precache.len(), "installing, caching static assets");

        let mut report = InstallReport { cache, cached: Vec::new(), failed: Vec::new(), complete: false, error: None };

        let state = match self.precache(&mut report).await {
            Ok(()) => {
                report.complete = report.failed.is_empty();
                tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "static assets cached");
                WorkerState::Installed
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed");
                let state = match &e {
                    Error::PrecacheFailed(_) => WorkerState::Installed,
                    _ => WorkerState::Redundant,
                };
                report.error = Some(e.to_string());
                state
            }
        };

        self.registration.skip_waiting();
        self.registration.set_state(state);
        report
    }

    async fn precache(&self, report: &mut InstallReport) -> Result<(), Error> {
        let store = self.db.open_store(&self.config.static_cache).await?;

        let requests: Vec<RequestDescriptor> =
            self.config.precache.iter().cloned().map(RequestDescriptor::get).collect();
        let results = join_all(requests.iter().map(|request| self.fetcher.fetch(request))).await;

        let mut fetched: Vec<(RequestDescriptor, StoredResponse)> = Vec::new();
        for (request, result) in requests.into_iter().zip(results) {
            let reason = match result {
                Ok(response) if !response.is_ok() => format!("status {}", response.status),
                Ok(response) => match CacheStore::check_cacheable(&request, &response) {
                    Ok(()) => {
                        fetched.push((request, response));
                        continue;
                    }
                    Err(e) => e.to_string(),
                },
                Err(e) => e.to_string(),
            };
            tracing::warn!(url = %request.url, reason = %reason, "precache entry failed");
            report.failed.push(PrecacheFailure { url: request.url.to_string(), reason });
        }

        if self.config.precache_policy == PrecachePolicy::AllOrNothing && !report.failed.is_empty() {
            let urls: Vec<&str> = report.failed.iter().map(|f| f.url.as_str()).collect();
            return Err(Error::PrecacheFailed(format!("could not fetch {}", urls.join(", "))));
        }

        store.put_all(&fetched).await?;
        report.cached.extend(fetched.iter().map(|(request, _)| request.url.to_string()));

        Ok(())
    }

    /// Handle the activate event.
    ///
    /// Only an installed version that asked to skip waiting may activate;
    /// anything else is refused without touching the stores.
    pub async fn activate(&self) -> ActivateReport {
        let mut report = ActivateReport { deleted: Vec::new(), clients_claimed: false, refused: false, error: None };

        if let Err(state) = self.registration.begin_activation() {
            tracing::warn!(?state, "activation refused");
            report.refused = true;
            report.error = Some(format!("ACTIVATION_REFUSED: version is {state:?}, only an installed version activates"));
            return report;
        }
        tracing::info!("activating");

        match self.delete_stale_stores(&mut report).await {
            Ok(()) => {
                self.registration.claim_clients();
                report.clients_claimed = true;
                self.registration.set_state(WorkerState::Activated);
                tracing::info!(deleted = report.deleted.len(), "activated and claimed clients");
            }
            Err(e) => {
                tracing::error!(error = %e, "activation failed");
                self.registration.set_state(WorkerState::Installed);
                report.error = Some(e.to_string());
            }
        }

        report
    }

    async fn delete_stale_stores(&self, report: &mut ActivateReport) -> Result<(), Error> {
        let current = [self.config.static_cache.as_str(), self.config.runtime_cache.as_str()];
        for name in self.db.store_names().await? {
            if current.contains(&name.as_str()) {
                continue;
            }
            tracing::info!(cache = %name, "deleting old cache");
            if self.db.delete_store(&name).await? {
                report.deleted.push(name);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::testing::{app_config, get, html, proxy, proxy_with, site_url};
    use swcache_core::AppConfig;

    fn small_manifest() -> AppConfig {
        AppConfig {
            precache: vec!["/".into(), "/assets/main.css".into(), "/offline.html".into()],
            ..app_config()
        }
    }

    #[tokio::test]
    async fn test_install_populates_static_store() {
        let (proxy, fetcher, db) = proxy_with(small_manifest()).await;
        fetcher.respond(&site_url("/"), html("home"));
        fetcher.respond(&site_url("/assets/main.css"), StoredResponse::new(200, "body{}"));
        fetcher.respond(&site_url("/offline.html"), html("offline"));

        let report = proxy.install().await;

        assert!(report.complete);
        assert!(report.error.is_none());
        assert_eq!(report.cache, "dpm-v1");
        assert_eq!(report.cached.len(), 3);
        let store = db.open_store("dpm-v1").await.unwrap();
        assert_eq!(store.len().await.unwrap(), 3);
        assert!(store.match_request(&get("/assets/main.css")).await.unwrap().is_some());
        assert_eq!(proxy.registration().state(), WorkerState::Installed);
        assert!(proxy.registration().may_activate());
    }

    #[tokio::test]
    async fn test_install_all_or_nothing_writes_nothing_on_failure() {
        let (proxy, fetcher, db) = proxy_with(small_manifest()).await;
        fetcher.respond(&site_url("/"), html("home"));
        fetcher.respond(&site_url("/assets/main.css"), StoredResponse::new(404, "missing"));

        let report = proxy.install().await;

        assert!(!report.complete);
        assert!(report.error.as_deref().unwrap().starts_with("PRECACHE_FAILED"));
        assert_eq!(report.failed.len(), 2);
        assert!(report.cached.is_empty());
        assert!(db.open_store("dpm-v1").await.unwrap().is_empty().await.unwrap());
        // failure is swallowed: activation still proceeds
        assert!(proxy.registration().may_activate());
    }

    #[tokio::test]
    async fn test_install_best_effort_keeps_successes() {
        let config = AppConfig { precache_policy: PrecachePolicy::BestEffort, ..small_manifest() };
        let (proxy, fetcher, db) = proxy_with(config).await;
        fetcher.respond(&site_url("/"), html("home"));
        fetcher.respond(&site_url("/offline.html"), html("offline"));

        let report = proxy.install().await;

        assert!(!report.complete);
        assert!(report.error.is_none());
        assert_eq!(report.cached.len(), 2);
        assert_eq!(report.failed, vec![PrecacheFailure {
            url: site_url("/assets/main.css"),
            reason: "NETWORK_ERROR: connection refused: https://dharmaputra.example/assets/main.css".into(),
        }]);
        assert_eq!(db.open_store("dpm-v1").await.unwrap().len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_activate_deletes_only_foreign_stores() {
        let config = AppConfig { cache_name: "x".into(), cache_version: "v1".into(), ..app_config() };
        let (proxy, _, db) = proxy_with(config).await;
        for name in ["x-v1", "x-runtime-v1", "x-v0"] {
            db.open_store(name).await.unwrap();
        }
        let _ = proxy.install().await;

        let report = proxy.activate().await;

        assert_eq!(report.deleted, vec!["x-v0".to_string()]);
        assert!(report.clients_claimed);
        let mut remaining = db.store_names().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["x-runtime-v1".to_string(), "x-v1".to_string()]);
        assert_eq!(proxy.registration().state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_version_bump_orphans_previous_stores() {
        let (old, fetcher, db) = proxy().await;
        fetcher.respond(&site_url("/"), html("home"));
        db.open_store("dpm-runtime-v1").await.unwrap();
        let _ = old.install().await;

        let config = AppConfig { cache_version: "v2".into(), precache: vec![], ..app_config() };
        let new = crate::proxy::OfflineProxy::new(
            crate::proxy::ProxyConfig::from_app(&config).unwrap(),
            db.clone(),
            fetcher.clone(),
        );
        let _ = new.install().await;
        let report = new.activate().await;

        let mut deleted = report.deleted.clone();
        deleted.sort();
        assert_eq!(deleted, vec!["dpm-runtime-v1".to_string(), "dpm-v1".to_string()]);
        assert_eq!(db.store_names().await.unwrap(), vec!["dpm-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_vary_star_fails_precache_and_writes_nothing() {
        let config = AppConfig { precache: vec!["/".into(), "/b.css".into()], ..app_config() };
        let (proxy, fetcher, db) = proxy_with(config).await;
        fetcher.respond(&site_url("/"), html("home"));
        fetcher.respond(&site_url("/b.css"), StoredResponse::new(200, "b").with_header("Vary", "*"));

        let report = proxy.install().await;

        assert!(report.error.as_deref().unwrap().starts_with("PRECACHE_FAILED"));
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].url, site_url("/b.css"));
        assert!(report.cached.is_empty());
        assert!(db.open_store("dpm-v1").await.unwrap().is_empty().await.unwrap());
        assert_eq!(proxy.registration().state(), WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_best_effort_skips_vary_star_entry() {
        let config = AppConfig {
            precache: vec!["/".into(), "/b.css".into()],
            precache_policy: PrecachePolicy::BestEffort,
            ..app_config()
        };
        let (proxy, fetcher, db) = proxy_with(config).await;
        fetcher.respond(&site_url("/"), html("home"));
        fetcher.respond(&site_url("/b.css"), StoredResponse::new(200, "b").with_header("Vary", "*"));

        let report = proxy.install().await;

        assert!(report.error.is_none());
        assert_eq!(report.cached, vec![site_url("/")]);
        assert_eq!(db.open_store("dpm-v1").await.unwrap().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_uninstalled_version_refuses_to_activate() {
        let (proxy, _, db) = proxy().await;
        db.open_store("dpm-v0").await.unwrap();

        let report = proxy.activate().await;

        assert!(report.refused);
        assert!(!report.clients_claimed);
        assert!(report.deleted.is_empty());
        assert!(report.error.as_deref().unwrap().starts_with("ACTIVATION_REFUSED"));
        assert_eq!(db.store_names().await.unwrap(), vec!["dpm-v0".to_string()]);
        assert_eq!(proxy.registration().state(), WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_redundant_version_keeps_previous_stores() {
        let (proxy, _, db) = proxy().await;
        let previous = db.open_store("dpm-v0").await.unwrap();
        previous.put(&get("/"), &html("old home")).await.unwrap();
        proxy.registration().skip_waiting();
        proxy.registration().set_state(WorkerState::Redundant);

        let report = proxy.activate().await;

        assert!(report.refused);
        assert_eq!(proxy.registration().state(), WorkerState::Redundant);
        assert_eq!(previous.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_activation_is_refused() {
        let config = AppConfig { precache: vec![], ..app_config() };
        let (proxy, _, _) = proxy_with(config).await;
        let _ = proxy.install().await;

        assert!(!proxy.activate().await.refused);
        assert!(proxy.activate().await.refused);
        assert_eq!(proxy.registration().state(), WorkerState::Activated);
    }

    #[test]
    fn test_redundant_never_activates() {
        let registration = Registration::default();
        registration.skip_waiting();
        registration.set_state(WorkerState::Redundant);
        assert!(!registration.may_activate());

        registration.set_state(WorkerState::Installed);
        assert!(registration.may_activate());
    }

    #[test]
    fn test_registration_defaults() {
        let registration = Registration::default();
        let status = registration.status();
        assert_eq!(status.state, WorkerState::Parsed);
        assert!(!status.skip_waiting);
        assert!(!status.clients_claimed);
        assert!(!registration.may_activate());
    }
}
