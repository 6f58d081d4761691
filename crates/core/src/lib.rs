//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Named cache stores with SQLite backend
//! - Request/response snapshots and URL resolution
//! - URL classification rules
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod location;
pub mod request;
pub mod route;

pub use cache::{CacheDb, CacheStore, EntrySummary, PendingSubmission};
pub use config::{AppConfig, ConfigError, PrecachePolicy};
pub use error::Error;
pub use request::{RequestDescriptor, ResponseSource, StoredResponse};
pub use route::{Route, RouteRule, Router, StoreKind, Strategy};
