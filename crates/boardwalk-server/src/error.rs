use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Error taxonomy shared by the REST surface and the realtime channel.
/// On the REST surface these map to HTTP statuses; on the realtime channel
/// they are emitted as `error` events without closing the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    RoomNotFound,
    /// Missing player, client-id mismatch, or wrong room.
    InvalidPlayer(String),
    RoomFull,
    GameAlreadyStarted,
    BadRequest(String),
    Internal(String),
}

impl AppError {
    /// Stable error code carried in realtime `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound => "ROOM_NOT_FOUND",
            Self::InvalidPlayer(_) => "INVALID_PLAYER",
            Self::RoomFull => "ROOM_FULL",
            Self::GameAlreadyStarted => "GAME_ALREADY_STARTED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomNotFound => write!(f, "Room not found"),
            Self::InvalidPlayer(m) => write!(f, "Invalid player: {m}"),
            Self::RoomFull => write!(f, "Room is full"),
            Self::GameAlreadyStarted => write!(f, "Game already started"),
            Self::BadRequest(m) | Self::Internal(m) => write!(f, "{m}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::RoomNotFound => StatusCode::NOT_FOUND,
            Self::InvalidPlayer(_) => StatusCode::FORBIDDEN,
            Self::RoomFull => StatusCode::FORBIDDEN,
            Self::GameAlreadyStarted => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = self.to_string();
        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}
