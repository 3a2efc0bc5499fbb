// ============================
// sessiongate-backend/src/lib.rs
// ============================
//! Session and authentication core for the `sessiongate` server.
//!
//! Users authenticate against a delegated identity provider; the server keeps
//! a session record per login, hands the browser a short-lived signed bearer
//! token plus a CSRF value, and reuses the same validation to admit
//! real-time connections.

pub mod auth;
pub mod channels;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod storage;
pub mod validation;
pub mod websocket;
pub mod ws_router;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::auth::provider::{HttpIdentityProvider, MemoryIdentityProvider};
use crate::auth::{IdentityProvider, SessionManager, TokenIssuer};
use crate::channels::ChannelHub;
use crate::config::{ProviderKind, Settings, StorageBackend};
use crate::storage::{FlatFileSessionStore, MemorySessionStore, SessionStore};

pub use router::create_router;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub sessions: SessionManager,
    /// Real-time channel fan-out
    pub hub: Arc<ChannelHub>,
}

impl AppState {
    /// Wire the state from explicit collaborators
    pub fn new(
        settings: Settings,
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let tokens = TokenIssuer::new(settings.jwt_secret.as_bytes(), settings.token_ttl());
        let sessions = SessionManager::new(store, provider, tokens, settings.session_ttl());
        Self {
            settings,
            sessions,
            hub: Arc::new(ChannelHub::default()),
        }
    }

    /// Build the store and identity provider the settings ask for
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let store: Arc<dyn SessionStore> = match settings.storage.backend {
            StorageBackend::Memory => Arc::new(MemorySessionStore::new()),
            StorageBackend::File => Arc::new(
                FlatFileSessionStore::new(&settings.storage.path).with_context(|| {
                    format!("opening session store at {}", settings.storage.path.display())
                })?,
            ),
        };

        let provider: Arc<dyn IdentityProvider> = match settings.provider.kind {
            ProviderKind::Http => Arc::new(
                HttpIdentityProvider::new(
                    settings.provider.base_url.clone(),
                    settings.provider.api_key.clone(),
                    Duration::from_secs(settings.provider.timeout_secs),
                )
                .context("building identity provider client")?,
            ),
            ProviderKind::Memory => {
                tracing::warn!("using the in-memory identity provider; accounts are not persisted");
                Arc::new(MemoryIdentityProvider::new())
            },
        };

        Ok(Self::new(settings, store, provider))
    }
}
