use serde::{Deserialize, Serialize};

use crate::PlayerId;
use crate::board::{BOARD_SIZE, Property};
use crate::time::timestamp_now;

/// Dice value meaning "not yet rolled this turn".
pub const DICE_NOT_ROLLED: [u8; 2] = [0, 0];

/// Authoritative per-room game state, attached to a room once it enters
/// `Playing`. The board is fixed after generation; `current_player_index`
/// points into the room's roster in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Vec<Property>,
    pub current_player_index: usize,
    pub dice: [u8; 2],
    /// Append-only event log; clients display only the most recent entries.
    pub logs: Vec<String>,
    pub winner_id: Option<PlayerId>,
    /// Last-write stamp (epoch millis) for client-side staleness detection.
    /// Not used for conflict resolution — commands for one room are
    /// serialized by the runtime.
    pub timestamp: u64,
}

impl GameState {
    /// Initial state at game start: first player's turn, dice unrolled,
    /// a single opening log line.
    pub fn new(board: Vec<Property>, city: &str) -> Self {
        Self {
            board,
            current_player_index: 0,
            dice: DICE_NOT_ROLLED,
            logs: vec![format!("Game started in {city}!")],
            winner_id: None,
            timestamp: timestamp_now(),
        }
    }

    pub fn append_log(&mut self, entry: String) {
        self.logs.push(entry);
    }

    /// Refresh the last-write stamp. Called once per persisted mutation.
    pub fn touch(&mut self) {
        self.timestamp = timestamp_now();
    }
}

/// Movement arithmetic: positions wrap past the last slot back to the
/// start. Passing or landing on start carries no reward in current rules.
pub fn advance_position(position: u8, d1: u8, d2: u8) -> u8 {
    ((position as usize + d1 as usize + d2 as usize) % BOARD_SIZE) as u8
}
