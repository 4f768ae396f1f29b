// SPDX-FileCopyrightText: 2026 Workwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast fan-out for push delivery.
//!
//! The [`Broadcaster`] is the one delivery primitive shared by the chat
//! service, the call registry, the signaling room manager, and the gateway.
//! It knows three things about every live connection: its outbound frame
//! sender, the user it is bound to (the personal channel), and the logical
//! channels it has joined.
//!
//! Delivery is best-effort and fire-and-forget: a slow or closed receiver
//! drops the frame for that connection only. Nothing here is persisted;
//! the registry dies with the process.

use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::trace;

/// Outbound frame buffer per connection. Frames beyond this are dropped
/// for that connection rather than applying backpressure to the sender.
pub const CONNECTION_BUFFER: usize = 64;

/// Process-wide fan-out registry.
#[derive(Default)]
pub struct Broadcaster {
    /// Connection id -> outbound frame sender.
    senders: DashMap<String, mpsc::Sender<String>>,
    /// Connection id -> bound user id.
    conn_user: DashMap<String, String>,
    /// User id -> connection ids (the personal channel).
    users: DashMap<String, HashSet<String>>,
    /// Channel id -> member connection ids.
    channels: DashMap<String, HashSet<String>>,
    /// Connection id -> channels it joined, for disconnect sweep.
    conn_channels: DashMap<String, HashSet<String>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection bound to a verified user and return the
    /// receiving half of its outbound frame queue.
    ///
    /// Registration joins the user's personal channel automatically.
    pub fn register(&self, conn_id: &str, user_id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER);
        self.senders.insert(conn_id.to_string(), tx);
        self.conn_user
            .insert(conn_id.to_string(), user_id.to_string());
        self.users
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id.to_string());
        trace!(conn_id, user_id, "connection registered");
        rx
    }

    /// Remove a connection from the sender registry, its personal channel,
    /// and every channel it joined.
    pub fn unregister(&self, conn_id: &str) {
        self.senders.remove(conn_id);

        if let Some((_, user_id)) = self.conn_user.remove(conn_id) {
            let mut drop_user = false;
            if let Some(mut conns) = self.users.get_mut(&user_id) {
                conns.remove(conn_id);
                drop_user = conns.is_empty();
            }
            if drop_user {
                self.users.remove(&user_id);
            }
        }

        if let Some((_, joined)) = self.conn_channels.remove(conn_id) {
            for channel in joined {
                let mut drop_channel = false;
                if let Some(mut members) = self.channels.get_mut(&channel) {
                    members.remove(conn_id);
                    drop_channel = members.is_empty();
                }
                if drop_channel {
                    self.channels.remove(&channel);
                }
            }
        }
        trace!(conn_id, "connection unregistered");
    }

    /// Join a logical channel (a conversation id, typically).
    pub fn join(&self, conn_id: &str, channel: &str) {
        if !self.senders.contains_key(conn_id) {
            return;
        }
        self.channels
            .entry(channel.to_string())
            .or_default()
            .insert(conn_id.to_string());
        self.conn_channels
            .entry(conn_id.to_string())
            .or_default()
            .insert(channel.to_string());
    }

    /// Leave a logical channel. A no-op if the connection never joined.
    pub fn leave(&self, conn_id: &str, channel: &str) {
        let mut drop_channel = false;
        if let Some(mut members) = self.channels.get_mut(channel) {
            members.remove(conn_id);
            drop_channel = members.is_empty();
        }
        if drop_channel {
            self.channels.remove(channel);
        }
        if let Some(mut joined) = self.conn_channels.get_mut(conn_id) {
            joined.remove(channel);
        }
    }

    /// The outbound sender for one connection, if still registered.
    pub fn sender_of(&self, conn_id: &str) -> Option<mpsc::Sender<String>> {
        self.senders.get(conn_id).map(|s| s.clone())
    }

    /// The user a connection is bound to, if still registered.
    pub fn user_of(&self, conn_id: &str) -> Option<String> {
        self.conn_user.get(conn_id).map(|u| u.clone())
    }

    fn deliver(&self, conn_id: &str, frame: &str) {
        if let Some(sender) = self.senders.get(conn_id)
            && sender.try_send(frame.to_string()).is_err()
        {
            trace!(conn_id, "dropping frame for slow or closed connection");
        }
    }

    /// Push a frame to every connection joined to the channel.
    pub fn send_to_channel(&self, channel: &str, frame: &str) {
        let members: Vec<String> = match self.channels.get(channel) {
            Some(members) => members.iter().cloned().collect(),
            None => return,
        };
        for conn_id in members {
            self.deliver(&conn_id, frame);
        }
    }

    /// Push a frame to every connection joined to the channel except one
    /// (the sender of the triggering event).
    pub fn send_to_channel_except(&self, channel: &str, except_conn: &str, frame: &str) {
        let members: Vec<String> = match self.channels.get(channel) {
            Some(members) => members.iter().cloned().collect(),
            None => return,
        };
        for conn_id in members {
            if conn_id != except_conn {
                self.deliver(&conn_id, frame);
            }
        }
    }

    /// Push a frame to every connection of one user (their personal channel).
    pub fn send_to_user(&self, user_id: &str, frame: &str) {
        let conns: Vec<String> = match self.users.get(user_id) {
            Some(conns) => conns.iter().cloned().collect(),
            None => return,
        };
        for conn_id in conns {
            self.deliver(&conn_id, frame);
        }
    }

    /// Push a frame to every registered connection except one.
    pub fn broadcast_except(&self, except_conn: &str, frame: &str) {
        let conns: Vec<String> = self.senders.iter().map(|e| e.key().clone()).collect();
        for conn_id in conns {
            if conn_id != except_conn {
                self.deliver(&conn_id, frame);
            }
        }
    }

    /// Whether the connection is currently joined to the channel.
    pub fn is_member(&self, conn_id: &str, channel: &str) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|members| members.contains(conn_id))
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }
}
