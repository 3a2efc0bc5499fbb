// ============================
// sessiongate-backend/src/storage/mod.rs
// ============================
//! Session store abstraction with in-memory and flat-file implementations.
//!
//! The store is the only source of truth for sessions: a record is readable
//! iff it was written, has not been deleted, and its TTL has not run out.
//! Expiry is enforced by the store itself; callers never compare timestamps.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::auth::Session;

mod file;
mod memory;

pub use file::FlatFileSessionStore;
pub use memory::MemorySessionStore;

/// Namespace for session records in a store shared with other data
pub const SESSION_KEY_PREFIX: &str = "session:";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value session storage with per-key TTL
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `session` under `id`, replacing any previous value and
    /// restarting its TTL
    async fn set(&self, id: &str, session: &Session, ttl: Duration) -> Result<(), StoreError>;

    /// Overwrite a live record and restart its TTL. Returns `false`, writing
    /// nothing, when the record was deleted or has expired.
    async fn replace(&self, id: &str, session: &Session, ttl: Duration) -> Result<bool, StoreError>;

    /// Fetch a live session; expired and missing records both read as `None`
    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Atomically set `last_activity` on a live record and restart its TTL.
    /// Returns `false` when there is no live record.
    async fn touch(&self, id: &str, at: DateTime<Utc>, ttl: Duration) -> Result<bool, StoreError>;

    /// Remove a record; removing a missing record is not an error
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Scan for every live session of a user. Not for per-request paths.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError>;

    /// Drop expired records, returning how many were removed
    async fn purge_expired(&self) -> Result<usize, StoreError>;

    /// Liveness probe that does not touch session data
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Periodically purge expired records from `store`
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {},
                Ok(removed) => tracing::debug!(removed, "purged expired sessions"),
                Err(e) => tracing::warn!(error = %e, "session sweep failed"),
            }
        }
    })
}
