// ============================
// sessiongate-backend/src/auth/session.rs
// ============================
//! The server-side session record.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sessiongate_common::SessionSummary;
use uuid::Uuid;

use super::provider::ProviderSession;
use super::token_generator::generate_secure_token;

/// Audit data captured when a session is created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Session information
///
/// `session_id`, `user_id`, `csrf_token` and `created_at` never change after
/// creation. Provider tokens rotate on refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub provider_access_token: String,
    pub provider_refresh_token: String,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Session {
    /// Build a fresh session with a new id and CSRF value
    pub fn new(user_id: String, provider: ProviderSession, client: ClientInfo) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            user_id,
            provider_access_token: provider.access_token,
            provider_refresh_token: provider.refresh_token,
            csrf_token: generate_secure_token(),
            created_at: now,
            last_activity: now,
            ip: client.ip,
            user_agent: client.user_agent,
        }
    }

    /// Swap in the provider tokens returned by a session exchange
    pub fn rotate_provider_tokens(&mut self, renewed: ProviderSession, at: DateTime<Utc>) {
        self.provider_access_token = renewed.access_token;
        self.provider_refresh_token = renewed.refresh_token;
        self.last_activity = at;
    }

    pub fn summary(&self, current_session_id: &str) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            created_at: self.created_at,
            last_activity: self.last_activity,
            ip: self.ip.clone(),
            user_agent: self.user_agent.clone(),
            current: self.session_id == current_session_id,
        }
    }
}

// Provider tokens and the CSRF value stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("user_id", &self.user_id)
            .field("provider_access_token", &"<redacted>")
            .field("provider_refresh_token", &"<redacted>")
            .field("csrf_token", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("last_activity", &self.last_activity)
            .field("ip", &self.ip)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
