//! SQLite-backed named cache stores.
//!
//! This module provides persistent, versioned cache stores using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named stores that can be enumerated and deleted as a unit
//! - Request-keyed entries with `Vary`-aware matching
//! - Whole-row UPSERT writes (last writer wins)
//! - A durable outbox of submissions captured while offline
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod outbox;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheStore, EntrySummary};
pub use outbox::PendingSubmission;
