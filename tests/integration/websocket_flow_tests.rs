// ============================
// tests/integration/websocket_flow_tests.rs
// ============================
//! Real-time handshake and channel flows against a live listener.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use sessiongate_backend::auth::ClientInfo;
use sessiongate_common::{ClientMessage, ServerMessage};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

use crate::test_utils::{setup_test_env, spawn_server, wait_briefly, TestEnv};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr, token: Option<&str>) -> Result<Socket, WsError> {
    let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
    if let Some(token) = token {
        request.headers_mut().insert(
            "cookie",
            HeaderValue::from_str(&format!("access_token={token}")).unwrap(),
        );
    }
    connect_async(request).await.map(|(socket, _)| socket)
}

async fn next_message(socket: &mut Socket) -> ServerMessage {
    loop {
        let frame = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for server message")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send(socket: &mut Socket, message: &ClientMessage) {
    let text = serde_json::to_string(message).unwrap();
    socket.send(Message::text(text)).await.unwrap();
}

async fn signed_in(env: &TestEnv) -> (String, String, String) {
    let outcome = env
        .state
        .sessions
        .signup("ada@example.com", "ada", "hunter22", ClientInfo::default())
        .await
        .unwrap();
    (outcome.token, outcome.user_id, outcome.session_id)
}

fn assert_unauthorized(result: Result<Socket, WsError>) {
    match result {
        Err(WsError::Http(response)) => assert_eq!(response.status(), 401),
        Err(other) => panic!("expected an HTTP 401, got {other}"),
        Ok(_) => panic!("handshake should have been refused"),
    }
}

#[tokio::test]
async fn test_handshake_requires_session() {
    let env = setup_test_env();
    let addr = spawn_server(env.state.clone()).await;

    assert_unauthorized(connect(addr, None).await);
    assert_unauthorized(connect(addr, Some("garbage")).await);

    let (_, user_id, session_id) = signed_in(&env).await;
    let expired = env
        .state
        .sessions
        .tokens()
        .issue_with_ttl(&session_id, &user_id, -1)
        .unwrap();
    assert_unauthorized(connect(addr, Some(&expired)).await);
    assert_eq!(env.state.hub.connection_count(), 0);
}

#[tokio::test]
async fn test_connected_then_join_ping_and_events() {
    let env = setup_test_env();
    let addr = spawn_server(env.state.clone()).await;
    let (token, user_id, _) = signed_in(&env).await;

    let mut socket = connect(addr, Some(&token)).await.unwrap();
    assert_eq!(
        next_message(&mut socket).await,
        ServerMessage::Connected {
            user_id: user_id.clone(),
            channel: format!("user:{user_id}"),
        }
    );

    send(&mut socket, &ClientMessage::Join { channel: "post:42".into() }).await;
    assert_eq!(
        next_message(&mut socket).await,
        ServerMessage::Joined { channel: "post:42".into() }
    );

    send(&mut socket, &ClientMessage::Ping).await;
    assert_eq!(next_message(&mut socket).await, ServerMessage::Pong);

    assert_eq!(env.state.hub.publish("post:42", "liked", json!({ "by": "grace" })), 1);
    assert_eq!(
        next_message(&mut socket).await,
        ServerMessage::Event {
            channel: "post:42".into(),
            event: "liked".into(),
            payload: json!({ "by": "grace" }),
        }
    );

    assert_eq!(env.state.hub.emit_to_user(&user_id, "notification", json!({ "n": 1 })), 1);
    assert!(matches!(
        next_message(&mut socket).await,
        ServerMessage::Event { event, .. } if event == "notification"
    ));
}

#[tokio::test]
async fn test_reserved_channel_and_malformed_frames() {
    let env = setup_test_env();
    let addr = spawn_server(env.state.clone()).await;
    let (token, _, _) = signed_in(&env).await;

    let mut socket = connect(addr, Some(&token)).await.unwrap();
    next_message(&mut socket).await;

    send(&mut socket, &ClientMessage::Join { channel: "user:someone-else".into() }).await;
    assert!(matches!(
        next_message(&mut socket).await,
        ServerMessage::Error { code, .. } if code == "INVALID_CHANNEL"
    ));
    assert_eq!(env.state.hub.members("user:someone-else"), 0);

    socket.send(Message::text("{not json".to_string())).await.unwrap();
    assert!(matches!(
        next_message(&mut socket).await,
        ServerMessage::MalformedMessage { .. }
    ));
}

#[tokio::test]
async fn test_disconnect_leaves_channels_and_logout_blocks_new_handshakes() {
    let env = setup_test_env();
    let addr = spawn_server(env.state.clone()).await;
    let (token, user_id, session_id) = signed_in(&env).await;

    let mut socket = connect(addr, Some(&token)).await.unwrap();
    next_message(&mut socket).await;
    send(&mut socket, &ClientMessage::Join { channel: "feed".into() }).await;
    next_message(&mut socket).await;
    assert_eq!(env.state.hub.members("feed"), 1);

    socket.close(None).await.unwrap();
    drop(socket);
    for _ in 0..50 {
        if env.state.hub.connection_count() == 0 {
            break;
        }
        wait_briefly(20).await;
    }
    assert_eq!(env.state.hub.members("feed"), 0);
    assert_eq!(env.state.hub.members(&format!("user:{user_id}")), 0);

    env.state.sessions.logout(&session_id).await.unwrap();
    assert_unauthorized(connect(addr, Some(&token)).await);
}
