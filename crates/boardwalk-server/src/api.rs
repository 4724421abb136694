use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use boardwalk_core::PlayerId;
use boardwalk_core::game::GameState;
use boardwalk_core::player::Player;
use boardwalk_core::room::{Room, is_valid_room_code};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomBody {
    pub city: String,
    pub nickname: String,
    pub client_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomBody {
    pub code: String,
    pub nickname: String,
    pub client_id: String,
}

/// What a client needs to open the realtime channel afterwards.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCredentials {
    pub room_code: String,
    pub player_id: PlayerId,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room: Room,
    pub players: Vec<Player>,
    pub game_state: Option<GameState>,
}

fn validate_identity(nickname: &str, client_id: &str) -> Result<(), AppError> {
    let nickname = nickname.trim();
    if nickname.is_empty() || nickname.len() > 32 || nickname.chars().any(char::is_control) {
        return Err(AppError::BadRequest("invalid nickname".to_string()));
    }
    if client_id.trim().is_empty() {
        return Err(AppError::BadRequest("clientId is required".to_string()));
    }
    Ok(())
}

/// POST /api/rooms — create a room; the creator becomes its host.
pub async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomBody>,
) -> Result<(StatusCode, Json<RoomCredentials>), AppError> {
    validate_identity(&body.nickname, &body.client_id)?;
    if body.city.trim().is_empty() {
        return Err(AppError::BadRequest("city is required".to_string()));
    }

    let (room, host) = state
        .coordinator
        .create_room(body.city.trim(), body.nickname.trim(), &body.client_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RoomCredentials {
            room_code: room.code,
            player_id: host.id,
            token: Uuid::new_v4().to_string(),
        }),
    ))
}

/// POST /api/rooms/join — join by code, or refresh a returning identity.
pub async fn join_room(
    State(state): State<AppState>,
    Json(body): Json<JoinRoomBody>,
) -> Result<Json<RoomCredentials>, AppError> {
    validate_identity(&body.nickname, &body.client_id)?;
    let code = body.code.trim();
    if !is_valid_room_code(code) {
        return Err(AppError::BadRequest("invalid room code".to_string()));
    }

    // Concurrent joins to one room are serialized so the capacity check
    // and the upsert cannot interleave.
    let _guard = state.room_locks.acquire(code).await;
    let (room, player) = state
        .coordinator
        .join_room(code, body.nickname.trim(), &body.client_id)
        .await?;
    Ok(Json(RoomCredentials {
        room_code: room.code,
        player_id: player.id,
        token: Uuid::new_v4().to_string(),
    }))
}

/// GET /api/rooms/{code} — current room, roster, and game state.
pub async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let (room, players) = state.coordinator.room_snapshot(&code).await?;
    let game_state = room.game_state.clone();
    Ok(Json(RoomSnapshot {
        room,
        players,
        game_state,
    }))
}
