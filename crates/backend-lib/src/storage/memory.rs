// ============================
// sessiongate-backend/src/storage/memory.rs
// ============================
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::time::Instant;

use super::{SessionStore, StoreError, SESSION_KEY_PREFIX};
use crate::auth::Session;

#[derive(Debug)]
struct StoredEntry {
    /// Serialized `Session`
    payload: String,
    user_id: String,
    expires_at: Instant,
}

impl StoredEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Process-local store. Each key is guarded by its dashmap shard lock, which
/// makes `touch` atomic per session.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, StoredEntry>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(id: &str) -> String {
        format!("{SESSION_KEY_PREFIX}{id}")
    }

    /// Number of records held, live or not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, id: &str, session: &Session, ttl: Duration) -> Result<(), StoreError> {
        let entry = StoredEntry {
            payload: serde_json::to_string(session)?,
            user_id: session.user_id.clone(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(Self::key(id), entry);
        Ok(())
    }

    async fn replace(&self, id: &str, session: &Session, ttl: Duration) -> Result<bool, StoreError> {
        let payload = serde_json::to_string(session)?;
        let now = Instant::now();
        match self.entries.get_mut(&Self::key(id)) {
            Some(mut entry) if entry.is_live(now) => {
                entry.payload = payload;
                entry.user_id = session.user_id.clone();
                entry.expires_at = now + ttl;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        let key = Self::key(id);
        let now = Instant::now();

        let payload = match self.entries.get(&key) {
            Some(entry) if entry.is_live(now) => Some(entry.payload.clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        match payload {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => {
                self.entries.remove_if(&key, |_, entry| !entry.is_live(now));
                Ok(None)
            },
        }
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>, ttl: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.entries.get_mut(&Self::key(id)) {
            Some(mut entry) if entry.is_live(now) => {
                let mut session: Session = serde_json::from_str(&entry.payload)?;
                session.last_activity = at;
                entry.payload = serde_json::to_string(&session)?;
                entry.expires_at = now + ttl;
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.entries.remove(&Self::key(id));
        Ok(())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let now = Instant::now();
        let payloads: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| {
                entry.key().starts_with(SESSION_KEY_PREFIX)
                    && entry.value().user_id == user_id
                    && entry.value().is_live(now)
            })
            .map(|entry| entry.value().payload.clone())
            .collect();

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(StoreError::from))
            .collect()
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        Ok(before.saturating_sub(self.entries.len()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
