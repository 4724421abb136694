use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{PlayerId, RoomId};

/// Money every player starts with.
pub const STARTING_MONEY: i64 = 2000;

/// A player in a room.
///
/// Identity is layered: `client_id` is the durable identity the client
/// persists across reloads and reconnects, while `connection_id` names the
/// live realtime channel and is `None` whenever the player is disconnected.
/// The `(room_id, client_id)` pair is the durable identity key — exactly
/// one player per room carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub room_id: RoomId,
    pub client_id: String,
    /// Weak back-reference to a live connection; the player does not own
    /// the connection's lifecycle.
    pub connection_id: Option<String>,
    pub nickname: String,
    pub money: i64,
    /// Track index, always in `0..40`.
    pub position: u8,
    pub color: String,
    pub is_host: bool,
    // Reserved by the data model; unused by current rules.
    pub is_jailed: bool,
    pub jail_turns: u32,
    /// Epoch millis, refreshed on heartbeat and reconnect.
    pub last_seen: u64,
}

impl Player {
    pub fn is_connected(&self) -> bool {
        self.connection_id.is_some()
    }
}

/// Random `#rrggbb` avatar color assigned at player creation.
pub fn random_color() -> String {
    let mut rng = rand::rng();
    format!("#{:06x}", rng.random_range(0..0x1000000u32))
}
