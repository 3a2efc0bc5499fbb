// ============================
// crates/backend-lib/src/middleware/guard.rs
// ============================
//! Request authentication guards.
//!
//! `require_session` is the strict guard: the bearer cookie must verify
//! with an unexpired signature and resolve to a live session.
//! `require_refresh_session` is used only on the refresh route and accepts a
//! token whose signature is valid but whose expiry has passed.
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use metrics::counter;

use super::cookies::read_cookie;
use crate::auth::Session;
use crate::error::AppError;
use crate::metrics::AUTH_REJECTED;
use crate::AppState;

/// Identity attached to requests that passed the strict guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub session_id: String,
}

/// Session attached to requests that passed the refresh guard
#[derive(Debug, Clone)]
pub struct RefreshSession(pub Session);

pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = read_cookie(request.headers(), &state.settings.cookies.access_name);
    let session = match token {
        Some(token) => state.sessions.validate_session(&token).await,
        None => None,
    };
    let Some(session) = session else {
        counter!(AUTH_REJECTED).increment(1);
        return Err(AppError::Unauthenticated);
    };

    request.extensions_mut().insert(AuthUser {
        user_id: session.user_id.clone(),
        session_id: session.session_id.clone(),
    });
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

pub async fn require_refresh_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = read_cookie(request.headers(), &state.settings.cookies.access_name) else {
        counter!(AUTH_REJECTED).increment(1);
        return Err(AppError::Unauthenticated);
    };
    let session = state.sessions.authorize_refresh(&token).await.inspect_err(|_| {
        counter!(AUTH_REJECTED).increment(1);
    })?;

    request.extensions_mut().insert(RefreshSession(session));
    Ok(next.run(request).await)
}
