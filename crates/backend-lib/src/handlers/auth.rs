// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! `/auth` endpoints. Input shape is checked here; everything else is
//! delegated to the `SessionManager`.
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use sessiongate_common::{
    AuthResponse, IdentityResponse, LoginRequest, MeResponse, SessionSummary, SignupRequest,
};

use crate::auth::{AuthOutcome, ClientInfo};
use crate::error::AppError;
use crate::middleware::cookies::{access_cookie, cleared_auth_cookies, csrf_cookie};
use crate::middleware::{AuthUser, RefreshSession};
use crate::validation;
use crate::AppState;

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Audit data for a new session: first `x-forwarded-for` hop or
/// `x-real-ip`, plus the user agent.
pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    let ip = header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| header_value(headers, "x-real-ip"))
        .map(String::from);
    ClientInfo {
        ip,
        user_agent: header_value(headers, "user-agent").map(String::from),
    }
}

fn auth_response(state: &AppState, outcome: AuthOutcome) -> (CookieJar, Json<AuthResponse>) {
    let cookies = &state.settings.cookies;
    let jar = CookieJar::new()
        .add(access_cookie(cookies, outcome.token, state.settings.token_ttl()))
        .add(csrf_cookie(
            cookies,
            outcome.csrf_token.clone(),
            state.settings.session_ttl(),
        ));
    (
        jar,
        Json(AuthResponse {
            user_id: outcome.user_id,
            csrf_token: outcome.csrf_token,
        }),
    )
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    validation::validate_signup(&req)?;
    let outcome = state
        .sessions
        .signup(&req.email, &req.username, &req.password, client_info(&headers))
        .await?;
    Ok(auth_response(&state, outcome))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    validation::validate_login(&req)?;
    let outcome = state
        .sessions
        .login(&req.email, &req.password, client_info(&headers))
        .await?;
    Ok(auth_response(&state, outcome))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.logout(&user.session_id).await?;
    Ok((StatusCode::NO_CONTENT, cleared_auth_cookies(&state.settings.cookies)))
}

pub async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
    })
}

/// Identity as the provider currently sees it
pub async fn identity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<IdentityResponse>, AppError> {
    let provider_user = state.sessions.get_user_from_session(&user.session_id).await?;
    Ok(Json(IdentityResponse {
        id: provider_user.id,
        email: provider_user.email,
    }))
}

pub async fn sessions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    let summaries = state
        .sessions
        .list_user_sessions(&user.user_id)
        .await?
        .iter()
        .map(|session| session.summary(&user.session_id))
        .collect();
    Ok(Json(summaries))
}

/// Re-issue the bearer cookie only; the CSRF cookie is untouched
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Extension(RefreshSession(session)): Extension<RefreshSession>,
) -> Result<impl IntoResponse, AppError> {
    let token = state.sessions.refresh(&session.session_id).await?;
    let jar = CookieJar::new().add(access_cookie(
        &state.settings.cookies,
        token,
        state.settings.token_ttl(),
    ));
    Ok((StatusCode::NO_CONTENT, jar))
}
