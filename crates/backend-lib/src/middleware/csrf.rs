// ============================
// crates/backend-lib/src/middleware/csrf.rs
// ============================
//! CSRF guard for mutating routes. Runs behind `require_session` and only
//! compares values already loaded there; it never reads the store.
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use metrics::counter;

use crate::auth::Session;
use crate::error::AppError;
use crate::metrics::CSRF_REJECTED;
use crate::AppState;

/// Accept only when a session is attached and `header` equals its CSRF value
pub fn check_csrf(session: Option<&Session>, header: Option<&str>) -> Result<(), AppError> {
    let Some(session) = session else {
        return Err(AppError::Forbidden("no session attached".to_string()));
    };
    match header {
        Some(value) if !value.is_empty() && value == session.csrf_token => Ok(()),
        Some(_) => Err(AppError::Forbidden("CSRF token mismatch".to_string())),
        None => Err(AppError::Forbidden("missing CSRF header".to_string())),
    }
}

pub async fn require_csrf(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(state.settings.cookies.csrf_header.as_str())
        .and_then(|v| v.to_str().ok());
    if let Err(e) = check_csrf(request.extensions().get::<Session>(), header) {
        counter!(CSRF_REJECTED).increment(1);
        tracing::debug!(reason = %e, "csrf check failed");
        return Err(e);
    }
    Ok(next.run(request).await)
}
