// ==================
// crates/backend-lib/src/websocket.rs
// ==================
//! Per-connection handler for the real-time channel.
//!
//! A `WebSocketHandler` exists only for connections that passed handshake
//! authentication. It turns client messages into hub operations and replies,
//! and removes the connection from every channel when dropped.

use std::sync::Arc;

use sessiongate_common::{ClientMessage, ServerMessage};
use tokio::sync::mpsc::{self, error::SendError};

use crate::channels::{ChannelHub, ConnectionId};
use crate::validation;

pub struct WebSocketHandler {
    hub: Arc<ChannelHub>,
    connection_id: ConnectionId,
    user_id: String,
    tx: mpsc::Sender<ServerMessage>,
}

impl WebSocketHandler {
    /// Register `user_id` with the hub. The returned receiver already holds
    /// the `Connected` message.
    pub fn register(hub: Arc<ChannelHub>, user_id: &str) -> (Self, mpsc::Receiver<ServerMessage>) {
        let sub = hub.connect(user_id);
        let handler = Self {
            hub,
            connection_id: sub.id,
            user_id: user_id.to_string(),
            tx: sub.sender,
        };
        (handler, sub.receiver)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn handle_message(&self, message: ClientMessage) -> ServerMessage {
        match message {
            ClientMessage::Join { channel } => match validation::validate_channel_name(&channel) {
                Ok(_) => {
                    self.hub.join(self.connection_id, &channel);
                    tracing::debug!(user_id = %self.user_id, %channel, "joined channel");
                    ServerMessage::Joined { channel }
                },
                Err(e) => invalid_channel(e),
            },
            ClientMessage::Leave { channel } => match validation::validate_channel_name(&channel) {
                Ok(_) => {
                    self.hub.leave(self.connection_id, &channel);
                    ServerMessage::Left { channel }
                },
                Err(e) => invalid_channel(e),
            },
            ClientMessage::Ping => ServerMessage::Pong,
        }
    }

    /// Queue a reply behind any events already pending for this connection
    pub async fn reply(&self, message: ServerMessage) -> Result<(), SendError<ServerMessage>> {
        self.tx.send(message).await
    }
}

fn invalid_channel(err: validation::ValidationError) -> ServerMessage {
    ServerMessage::Error {
        code: "INVALID_CHANNEL".to_string(),
        message: err.to_string(),
    }
}

impl Drop for WebSocketHandler {
    fn drop(&mut self) {
        self.hub.disconnect(self.connection_id);
    }
}
