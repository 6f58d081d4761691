//! Client code for swcache.
//!
//! This crate provides the network fetcher and the offline cache proxy:
//! caching strategies, request dispatch, install/activate lifecycle,
//! background sync, push notifications and control messages.

pub mod fetch;
pub mod proxy;

pub use fetch::{FetchClient, FetchConfig, Fetcher};
pub use proxy::{
    ActivateReport, Bypass, ClickOutcome, ControlMessage, InstallReport, KeepAlive, MessageOutcome, Notification,
    OfflineProxy, ProxyConfig, ProxyResponse, Registration, SyncReport, WorkerEvents, WorkerState,
};
