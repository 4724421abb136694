use serde::{Deserialize, Serialize};

use crate::PlayerId;
use crate::game::GameState;
use crate::player::Player;

/// Wire message type discriminator (the 1-byte frame prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    JoinRoom = 0x01,
    Heartbeat = 0x02,
    StartGame = 0x03,
    RollDice = 0x04,
    BuyProperty = 0x05,
    EndTurn = 0x06,

    // Server -> Client
    PlayerJoined = 0x10,
    PlayerDisconnected = 0x11,
    HostChanged = 0x12,
    GameStarted = 0x13,
    GameUpdate = 0x14,
    Error = 0x15,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::JoinRoom),
            0x02 => Some(Self::Heartbeat),
            0x03 => Some(Self::StartGame),
            0x04 => Some(Self::RollDice),
            0x05 => Some(Self::BuyProperty),
            0x06 => Some(Self::EndTurn),
            0x10 => Some(Self::PlayerJoined),
            0x11 => Some(Self::PlayerDisconnected),
            0x12 => Some(Self::HostChanged),
            0x13 => Some(Self::GameStarted),
            0x14 => Some(Self::GameUpdate),
            0x15 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Realtime join handshake. `player_id`/`client_id` must name a player
/// created beforehand through the REST surface; the server binds this
/// connection to that durable identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub code: String,
    pub player_id: PlayerId,
    pub client_id: String,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatMsg {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartGameMsg {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollDiceMsg {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyPropertyMsg {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndTurnMsg {
    pub code: String,
}

/// Sent to every channel member (including the joiner) after a successful
/// join, so all views of the roster converge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoinedMsg {
    pub player: Player,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerDisconnectedMsg {
    pub player_id: PlayerId,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostChangedMsg {
    pub new_host_id: PlayerId,
    pub nickname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStartedMsg {
    pub game_state: GameState,
}

/// Full-state snapshot pushed after every mutation. The server always
/// re-synchronizes the entire state rather than diffing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameUpdateMsg {
    pub game_state: GameState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    JoinRoom(JoinRoomMsg),
    Heartbeat(HeartbeatMsg),
    StartGame(StartGameMsg),
    RollDice(RollDiceMsg),
    BuyProperty(BuyPropertyMsg),
    EndTurn(EndTurnMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::JoinRoom(_) => MessageType::JoinRoom,
            Self::Heartbeat(_) => MessageType::Heartbeat,
            Self::StartGame(_) => MessageType::StartGame,
            Self::RollDice(_) => MessageType::RollDice,
            Self::BuyProperty(_) => MessageType::BuyProperty,
            Self::EndTurn(_) => MessageType::EndTurn,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    PlayerJoined(PlayerJoinedMsg),
    PlayerDisconnected(PlayerDisconnectedMsg),
    HostChanged(HostChangedMsg),
    GameStarted(Box<GameStartedMsg>),
    GameUpdate(Box<GameUpdateMsg>),
    Error(ErrorMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::PlayerJoined(_) => MessageType::PlayerJoined,
            Self::PlayerDisconnected(_) => MessageType::PlayerDisconnected,
            Self::HostChanged(_) => MessageType::HostChanged,
            Self::GameStarted(_) => MessageType::GameStarted,
            Self::GameUpdate(_) => MessageType::GameUpdate,
            Self::Error(_) => MessageType::Error,
        }
    }
}
