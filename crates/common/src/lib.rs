// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between `sessiongate` clients and the server.
//! This module defines the real-time protocol messages and the JSON bodies
//! of the `/auth` HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server over the real-time channel
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "msgType")]
pub enum ClientMessage {
    /// Subscribe this connection to a topic channel
    /// # Fields
    /// * `channel` - Topic name, e.g. `post:42`
    Join { channel: String },
    /// Unsubscribe this connection from a topic channel
    Leave { channel: String },
    /// Keep-alive probe; answered with `Pong`
    Ping,
}

/// Messages sent from server to client over the real-time channel
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "msgType")]
pub enum ServerMessage {
    /// First message on every accepted connection
    /// # Fields
    /// * `user_id` - The authenticated principal
    /// * `channel` - The private channel this connection was placed in
    Connected { user_id: String, channel: String },
    Joined { channel: String },
    Left { channel: String },
    /// A server-initiated event addressed to a channel
    Event {
        channel: String,
        event: String,
        payload: serde_json::Value,
    },
    Pong,
    MalformedMessage { err_msg: String },
    Error { code: String, message: String },
}

/// Body of `POST /auth/signup`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Body of `POST /auth/login`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by signup and login. The bearer token itself only travels in
/// the HTTP-only cookie.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: String,
    pub csrf_token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
}

/// Live identity as reported by the identity provider
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentityResponse {
    pub id: String,
    pub email: Option<String>,
}

/// Audit view of one session; never carries provider tokens or CSRF values
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    /// True for the session that made the listing request
    pub current: bool,
}
