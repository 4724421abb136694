use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::GameState;
use crate::{PlayerId, RoomId};

/// Lifecycle of a room. Transitions are one-directional:
/// `Waiting → Playing → Finished`, no regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl RoomStatus {
    /// Whether `self → next` is a legal status transition.
    pub fn can_transition_to(self, next: RoomStatus) -> bool {
        matches!(
            (self, next),
            (RoomStatus::Waiting, RoomStatus::Playing)
                | (RoomStatus::Playing, RoomStatus::Finished)
        )
    }
}

/// A shareable game session keyed by a short join code.
///
/// `host_id` is informational — host authority is resolved from the
/// `is_host` flag on the roster, which migrates on disconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub code: String,
    pub city: String,
    pub status: RoomStatus,
    pub host_id: Option<PlayerId>,
    pub game_state: Option<GameState>,
}

/// Length of generated join codes.
pub const ROOM_CODE_LEN: usize = 6;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a short human-shareable join code (uppercase alphanumeric).
/// Uniqueness among active rooms is enforced by the caller against the
/// repository.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Validate the join-code format before any repository lookup.
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
