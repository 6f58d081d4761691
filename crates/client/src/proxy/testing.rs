//! In-process network double for strategy and lifecycle tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use url::Url;

use swcache_core::{AppConfig, CacheDb, Error, RequestDescriptor, StoredResponse};

use super::{OfflineProxy, ProxyConfig};
use crate::fetch::Fetcher;

/// Answers from a script keyed by URL; anything unscripted fails like a
/// dropped connection.
pub(crate) struct ScriptedFetcher {
    replies: Mutex<HashMap<String, StoredResponse>>,
    log: Mutex<Vec<RequestDescriptor>>,
    calls: AtomicUsize,
    offline: AtomicBool,
    gate: watch::Sender<bool>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Arc<Self> {
        let (gate, _) = watch::channel(false);
        Arc::new(Self {
            replies: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            gate,
        })
    }

    pub(crate) fn respond(&self, url: &str, response: StoredResponse) {
        self.replies.lock().unwrap().insert(url.to_string(), response);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Park every fetch until [`release`](Self::release).
    pub(crate) fn hold(&self) {
        self.gate.send_replace(true);
    }

    pub(crate) fn release(&self) {
        self.gate.send_replace(false);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn requests(&self) -> Vec<RequestDescriptor> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<StoredResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(request.clone());

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|held| !*held).await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("network unreachable".into()));
        }

        self.replies
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("connection refused: {}", request.url)))
    }
}

pub(crate) const ORIGIN: &str = "https://dharmaputra.example";

pub(crate) fn site_url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

pub(crate) fn get(path: &str) -> RequestDescriptor {
    RequestDescriptor::get(Url::parse(&site_url(path)).unwrap())
}

pub(crate) fn html(body: &str) -> StoredResponse {
    StoredResponse::new(200, body).with_header("content-type", "text/html")
}

pub(crate) fn app_config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), cache_name: "dpm".into(), cache_version: "v1".into(), ..Default::default() }
}

pub(crate) async fn proxy_with(config: AppConfig) -> (OfflineProxy, Arc<ScriptedFetcher>, CacheDb) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let fetcher = ScriptedFetcher::new();
    let proxy_config = ProxyConfig::from_app(&config).unwrap();
    let proxy = OfflineProxy::new(proxy_config, db.clone(), fetcher.clone());
    (proxy, fetcher, db)
}

pub(crate) async fn proxy() -> (OfflineProxy, Arc<ScriptedFetcher>, CacheDb) {
    proxy_with(app_config()).await
}
