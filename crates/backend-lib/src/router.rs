// ============================
// sessiongate-backend/src/router.rs
// ============================
//! HTTP routes and the guards in front of them.
use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health};
use crate::middleware::{require_csrf, require_refresh_session, require_session};
use crate::ws_router::ws_handler;
use crate::AppState;

/// Build the full application router.
///
/// Guard order on mutating routes: `require_session` runs first and attaches
/// the session, then `require_csrf` compares against it.
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/me/identity", get(auth::identity))
        .route("/auth/sessions", get(auth::sessions))
        .route(
            "/auth/logout",
            post(auth::logout).route_layer(from_fn_with_state(state.clone(), require_csrf)),
        )
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let refresh = Router::new().route(
        "/auth/refresh",
        post(auth::refresh).route_layer(from_fn_with_state(state.clone(), require_refresh_session)),
    );

    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health::health))
        .route("/ws", get(ws_handler))
        .merge(protected)
        .merge(refresh)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
