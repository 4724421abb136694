use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::RwLock;

use boardwalk_core::PlayerId;
use boardwalk_core::game::GameState;
use boardwalk_core::net::messages::{
    ErrorMsg, GameStartedMsg, GameUpdateMsg, HostChangedMsg, PlayerDisconnectedMsg,
    PlayerJoinedMsg, ServerMessage,
};
use boardwalk_core::net::protocol::encode_server_message;
use boardwalk_core::player::Player;

use crate::error::AppError;
use crate::session::SessionRegistry;

/// Fans server events out to the connections subscribed to a room channel.
/// Every event is encoded once and the `Bytes` handle cloned per member.
/// Callers produce events under the room's command lock, so subscribers
/// observe them in production order (FIFO per room; nothing is guaranteed
/// across rooms).
#[derive(Clone)]
pub struct Broadcaster {
    sessions: Arc<RwLock<SessionRegistry>>,
}

impl Broadcaster {
    pub fn new(sessions: Arc<RwLock<SessionRegistry>>) -> Self {
        Self { sessions }
    }

    async fn broadcast(&self, room_code: &str, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => {
                let sessions = self.sessions.read().await;
                sessions.broadcast(room_code, Bytes::from(data));
            },
            Err(e) => {
                tracing::warn!(room_code, error = %e, "Failed to encode broadcast");
            },
        }
    }

    /// Roster convergence event, sent to every member including the joiner.
    pub async fn player_joined(&self, room_code: &str, player: Player, players: Vec<Player>) {
        self.broadcast(
            room_code,
            &ServerMessage::PlayerJoined(PlayerJoinedMsg { player, players }),
        )
        .await;
    }

    pub async fn player_disconnected(&self, room_code: &str, player_id: PlayerId, nickname: String) {
        self.broadcast(
            room_code,
            &ServerMessage::PlayerDisconnected(PlayerDisconnectedMsg {
                player_id,
                nickname,
            }),
        )
        .await;
    }

    pub async fn host_changed(&self, room_code: &str, new_host_id: PlayerId, nickname: String) {
        self.broadcast(
            room_code,
            &ServerMessage::HostChanged(HostChangedMsg {
                new_host_id,
                nickname,
            }),
        )
        .await;
    }

    pub async fn game_started(&self, room_code: &str, game_state: GameState) {
        self.broadcast(
            room_code,
            &ServerMessage::GameStarted(Box::new(GameStartedMsg { game_state })),
        )
        .await;
    }

    /// Full-state snapshot; the consistency contract is re-synchronization,
    /// not diffing.
    pub async fn game_update(&self, room_code: &str, game_state: GameState) {
        self.broadcast(
            room_code,
            &ServerMessage::GameUpdate(Box::new(GameUpdateMsg { game_state })),
        )
        .await;
    }
}

/// Encode an error event for one connection. The frame goes out on the
/// connection's own sender because join-time failures happen before the
/// connection is bound to any room channel.
pub fn encode_error_event(err: &AppError) -> Option<Bytes> {
    encode_single(ErrorMsg {
        code: err.code().to_string(),
        message: err.to_string(),
    })
}

/// Error event for a denied gameplay command, sent only under the
/// strict-error policy.
pub fn encode_denial_event(reason: &str) -> Option<Bytes> {
    encode_single(ErrorMsg {
        code: "COMMAND_DENIED".to_string(),
        message: reason.to_string(),
    })
}

fn encode_single(msg: ErrorMsg) -> Option<Bytes> {
    match encode_server_message(&ServerMessage::Error(msg)) {
        Ok(data) => Some(Bytes::from(data)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode error event");
            None
        },
    }
}
