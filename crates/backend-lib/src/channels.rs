// ============================
// sessiongate-backend/src/channels.rs
// ============================
//! Fan-out of server events to real-time connections grouped by channel.
//!
//! Every connection owns a bounded queue drained by its socket writer.
//! Delivery uses `try_send`: a full queue drops the event for that one
//! connection instead of stalling the publisher.
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use sessiongate_common::ServerMessage;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::validation::RESERVED_CHANNEL_PREFIX;

pub type ConnectionId = u64;

/// Per-connection queue depth
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

struct Connection {
    user_id: String,
    tx: mpsc::Sender<ServerMessage>,
    channels: HashSet<String>,
}

/// Handles returned to a newly registered connection
pub struct Subscription {
    pub id: ConnectionId,
    /// The private `user:{id}` channel the connection was placed in
    pub channel: String,
    pub sender: mpsc::Sender<ServerMessage>,
    pub receiver: mpsc::Receiver<ServerMessage>,
}

pub struct ChannelHub {
    connections: DashMap<ConnectionId, Connection>,
    channels: DashMap<String, HashSet<ConnectionId>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl Default for ChannelHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl ChannelHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            connections: DashMap::new(),
            channels: DashMap::new(),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Name of a user's private channel
    pub fn user_channel(user_id: &str) -> String {
        format!("{RESERVED_CHANNEL_PREFIX}{user_id}")
    }

    /// Register an authenticated connection, place it in its user channel and
    /// queue `Connected` as its first message.
    pub fn connect(&self, user_id: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let channel = Self::user_channel(user_id);

        // fresh queue with capacity >= 1, cannot be full
        let _ = tx.try_send(ServerMessage::Connected {
            user_id: user_id.to_string(),
            channel: channel.clone(),
        });

        self.connections.insert(
            id,
            Connection {
                user_id: user_id.to_string(),
                tx: tx.clone(),
                channels: HashSet::new(),
            },
        );
        self.join(id, &channel);
        tracing::debug!(connection_id = id, user_id, "realtime connection registered");

        Subscription {
            id,
            channel,
            sender: tx,
            receiver: rx,
        }
    }

    /// Add a connection to a channel. Returns `false` if it was already a
    /// member or is not registered.
    pub fn join(&self, id: ConnectionId, channel: &str) -> bool {
        {
            let Some(mut conn) = self.connections.get_mut(&id) else {
                return false;
            };
            if !conn.channels.insert(channel.to_string()) {
                return false;
            }
        }
        self.channels.entry(channel.to_string()).or_default().insert(id);
        true
    }

    /// Remove a connection from a channel. Returns `false` if it was not a member.
    pub fn leave(&self, id: ConnectionId, channel: &str) -> bool {
        {
            let Some(mut conn) = self.connections.get_mut(&id) else {
                return false;
            };
            if !conn.channels.remove(channel) {
                return false;
            }
        }
        self.drop_member(channel, id);
        true
    }

    /// Forget a connection and every channel membership it held
    pub fn disconnect(&self, id: ConnectionId) {
        let Some((_, conn)) = self.connections.remove(&id) else {
            return;
        };
        for channel in &conn.channels {
            self.drop_member(channel, id);
        }
        tracing::debug!(connection_id = id, user_id = %conn.user_id, "realtime connection removed");
    }

    fn drop_member(&self, channel: &str, id: ConnectionId) {
        if let Some(mut members) = self.channels.get_mut(channel) {
            members.remove(&id);
        }
        self.channels.remove_if(channel, |_, members| members.is_empty());
    }

    /// Deliver an `Event` to every member of `channel`, returning how many
    /// queues accepted it.
    pub fn publish(&self, channel: &str, event: &str, payload: serde_json::Value) -> usize {
        let members: Vec<ConnectionId> = match self.channels.get(channel) {
            Some(members) => members.iter().copied().collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for id in members {
            let Some(tx) = self.connections.get(&id).map(|conn| conn.tx.clone()) else {
                continue;
            };
            let message = ServerMessage::Event {
                channel: channel.to_string(),
                event: event.to_string(),
                payload: payload.clone(),
            };
            match tx.try_send(message) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = id, channel, event, "queue full, dropping event");
                },
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = id, channel, "connection closed before delivery");
                },
            }
        }
        delivered
    }

    /// Deliver an `Event` to every connection of `user_id`
    pub fn emit_to_user(&self, user_id: &str, event: &str, payload: serde_json::Value) -> usize {
        self.publish(&Self::user_channel(user_id), event, payload)
    }

    /// Number of connections currently in `channel`
    pub fn members(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, |members| members.len())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
