use serde::{Deserialize, Serialize};

use super::messages::{
    BuyPropertyMsg, ClientMessage, EndTurnMsg, ErrorMsg, GameStartedMsg, GameUpdateMsg,
    HeartbeatMsg, HostChangedMsg, JoinRoomMsg, MessageType, PlayerDisconnectedMsg, PlayerJoinedMsg,
    RollDiceMsg, ServerMessage, StartGameMsg,
};

/// Maximum message payload size in bytes. Full-state snapshots carry the
/// whole 40-tile board and log tail, so the cap is generous.
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024; // 256 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::JoinRoom(m) => encode_message(MessageType::JoinRoom, m),
        ClientMessage::Heartbeat(m) => encode_message(MessageType::Heartbeat, m),
        ClientMessage::StartGame(m) => encode_message(MessageType::StartGame, m),
        ClientMessage::RollDice(m) => encode_message(MessageType::RollDice, m),
        ClientMessage::BuyProperty(m) => encode_message(MessageType::BuyProperty, m),
        ClientMessage::EndTurn(m) => encode_message(MessageType::EndTurn, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::PlayerJoined(m) => encode_message(MessageType::PlayerJoined, m),
        ServerMessage::PlayerDisconnected(m) => encode_message(MessageType::PlayerDisconnected, m),
        ServerMessage::HostChanged(m) => encode_message(MessageType::HostChanged, m),
        ServerMessage::GameStarted(m) => encode_message(MessageType::GameStarted, m.as_ref()),
        ServerMessage::GameUpdate(m) => encode_message(MessageType::GameUpdate, m.as_ref()),
        ServerMessage::Error(m) => encode_message(MessageType::Error, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::JoinRoom => Ok(ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(
            data,
        )?)),
        MessageType::Heartbeat => Ok(ClientMessage::Heartbeat(decode_payload::<HeartbeatMsg>(
            data,
        )?)),
        MessageType::StartGame => Ok(ClientMessage::StartGame(decode_payload::<StartGameMsg>(
            data,
        )?)),
        MessageType::RollDice => Ok(ClientMessage::RollDice(decode_payload::<RollDiceMsg>(
            data,
        )?)),
        MessageType::BuyProperty => Ok(ClientMessage::BuyProperty(
            decode_payload::<BuyPropertyMsg>(data)?,
        )),
        MessageType::EndTurn => Ok(ClientMessage::EndTurn(decode_payload::<EndTurnMsg>(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::PlayerJoined => Ok(ServerMessage::PlayerJoined(decode_payload::<
            PlayerJoinedMsg,
        >(data)?)),
        MessageType::PlayerDisconnected => Ok(ServerMessage::PlayerDisconnected(decode_payload::<
            PlayerDisconnectedMsg,
        >(data)?)),
        MessageType::HostChanged => Ok(ServerMessage::HostChanged(decode_payload::<
            HostChangedMsg,
        >(data)?)),
        MessageType::GameStarted => Ok(ServerMessage::GameStarted(Box::new(decode_payload::<
            GameStartedMsg,
        >(data)?))),
        MessageType::GameUpdate => Ok(ServerMessage::GameUpdate(Box::new(decode_payload::<
            GameUpdateMsg,
        >(data)?))),
        MessageType::Error => Ok(ServerMessage::Error(decode_payload::<ErrorMsg>(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
