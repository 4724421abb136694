use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::mpsc;

use boardwalk_core::PlayerId;

/// Per-connection sender for outbound WebSocket binary frames.
/// Bounded to keep slow clients from exhausting memory; broadcasts to a
/// full channel are dropped, not awaited.
pub type ClientSender = mpsc::Sender<Bytes>;

/// What a live connection is bound to after a completed join handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub room_code: String,
    pub player_id: PlayerId,
}

struct Member {
    player_id: PlayerId,
    sender: ClientSender,
}

/// In-memory mapping from live connection handle to durable player
/// identity, plus per-room channel membership. Owned by the Connection
/// Coordinator; scoped to rooms rather than process-global, and cleared
/// per connection on disconnect.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    channels: HashMap<String, HashMap<String, Member>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a player and subscribe it to the room channel.
    /// Idempotent: re-binding the same connection replaces its previous
    /// membership, so repeated joins never duplicate a subscriber.
    pub fn bind(
        &mut self,
        connection_id: &str,
        room_code: &str,
        player_id: PlayerId,
        sender: ClientSender,
    ) {
        if let Some(previous) = self.sessions.insert(
            connection_id.to_string(),
            Session {
                room_code: room_code.to_string(),
                player_id,
            },
        ) && previous.room_code != room_code
            && let Some(members) = self.channels.get_mut(&previous.room_code)
        {
            members.remove(connection_id);
        }

        self.channels
            .entry(room_code.to_string())
            .or_default()
            .insert(connection_id.to_string(), Member { player_id, sender });
    }

    /// Remove a connection's binding and channel membership.
    /// Returns what it was bound to, if anything.
    pub fn unbind(&mut self, connection_id: &str) -> Option<Session> {
        let session = self.sessions.remove(connection_id)?;
        if let Some(members) = self.channels.get_mut(&session.room_code) {
            members.remove(connection_id);
            if members.is_empty() {
                self.channels.remove(&session.room_code);
            }
        }
        Some(session)
    }

    pub fn resolve(&self, connection_id: &str) -> Option<&Session> {
        self.sessions.get(connection_id)
    }

    pub fn member_count(&self, room_code: &str) -> usize {
        self.channels.get(room_code).map_or(0, HashMap::len)
    }

    /// Fan out one encoded frame to every member of a room channel.
    /// `Bytes` clones are zero-copy; slow clients with a full buffer are
    /// skipped rather than awaited, preserving FIFO order for the rest.
    pub fn broadcast(&self, room_code: &str, data: Bytes) {
        if let Some(members) = self.channels.get(room_code) {
            for (conn_id, member) in members {
                if let Err(e) = member.sender.try_send(data.clone()) {
                    tracing::debug!(
                        player_id = member.player_id,
                        conn_id,
                        room_code,
                        error = %e,
                        "Skipping broadcast to slow or closed client"
                    );
                }
            }
        }
    }
}
