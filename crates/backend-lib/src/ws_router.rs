// ============================
// sessiongate-backend/src/ws_router.rs
// ============================
//! Real-time endpoint: handshake authentication and the connection loop.
use crate::auth::Session;
use crate::error::AppError;
use crate::metrics::{WS_ACTIVE, WS_CONNECTION, WS_REJECTED};
use crate::middleware::cookies::read_cookie;
use crate::websocket::WebSocketHandler;
use crate::AppState;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use sessiongate_common::{ClientMessage, ServerMessage};
use std::sync::Arc;

/// Handler for `GET /ws`.
///
/// The bearer cookie is checked with the same `validate_session` used by the
/// strict HTTP guard. A failure answers 401 and the upgrade never happens.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let session = match read_cookie(&headers, &state.settings.cookies.access_name) {
        Some(token) => state.sessions.validate_session(&token).await,
        None => None,
    };
    let Some(session) = session else {
        counter!(WS_REJECTED).increment(1);
        tracing::debug!("realtime handshake rejected");
        return AppError::Unauthenticated.into_response();
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    counter!(WS_CONNECTION).increment(1);
    ws.on_failed_upgrade(|e| tracing::warn!(error = %e, "websocket upgrade failed"))
        .on_upgrade(move |socket| handle_connection(socket, state, session))
}

async fn handle_connection(socket: WebSocket, state: Arc<AppState>, session: Session) {
    let (mut tx, mut rx) = socket.split();
    let (handler, mut server_rx) = WebSocketHandler::register(state.hub.clone(), &session.user_id);

    gauge!(WS_ACTIVE).increment(1.0);
    tracing::info!(
        connection_id = handler.connection_id(),
        user_id = %session.user_id,
        session_id = %session.session_id,
        "realtime connection opened"
    );

    // Writer: drains the connection's queue into the socket
    let send_task = tokio::spawn(async move {
        while let Some(server_msg) = server_rx.recv().await {
            let json = match serde_json::to_string(&server_msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "failed to serialize server message");
                    continue;
                },
            };
            if tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = rx.next().await {
        match message {
            Message::Text(text) => {
                let reply = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => handler.handle_message(client_msg),
                    Err(e) => ServerMessage::MalformedMessage {
                        err_msg: e.to_string(),
                    },
                };
                if handler.reply(reply).await.is_err() {
                    break;
                }
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    tracing::info!(
        connection_id = handler.connection_id(),
        user_id = handler.user_id(),
        "realtime connection closed"
    );
    drop(handler);
    gauge!(WS_ACTIVE).decrement(1.0);
    send_task.abort();
}
