use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use boardwalk_core::net::messages::ClientMessage;
use boardwalk_core::net::protocol::{MAX_MESSAGE_SIZE, decode_client_message};
use boardwalk_core::room::is_valid_room_code;

use crate::broadcast::{encode_denial_event, encode_error_event};
use crate::config::TurnDenialPolicy;
use crate::engine::CommandOutcome;
use crate::error::AppError;
use crate::session::ClientSender;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let connection_id = Uuid::new_v4().to_string();
    let (ws_sender, mut ws_receiver) = socket.split();

    let (tx, rx) = mpsc::channel::<Bytes>(state.config.limits.player_message_buffer);
    spawn_writer(ws_sender, rx);

    tracing::debug!(connection_id, "WS connection opened");
    read_loop(&mut ws_receiver, &state, &connection_id, &tx).await;

    // Connection closed; the room's command lock covers the disconnect
    // sequence so it never interleaves with gameplay commands.
    let room_code = state
        .sessions
        .read()
        .await
        .resolve(&connection_id)
        .map(|s| s.room_code.clone());
    let _room_guard = match &room_code {
        Some(code) => Some(state.room_locks.acquire(code).await),
        None => None,
    };
    state.coordinator.handle_disconnect(&connection_id).await;
    tracing::debug!(connection_id, "WS connection closed");
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    connection_id: &str,
    tx: &ClientSender,
) {
    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        // Malformed or oversized frames are dropped without closing
        if data.is_empty() || data.len() > MAX_MESSAGE_SIZE {
            continue;
        }
        let client_msg = match decode_client_message(&data) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(connection_id, error = %e, "Dropping undecodable frame");
                continue;
            },
        };

        dispatch(state, connection_id, tx, client_msg).await;
    }
}

async fn dispatch(
    state: &AppState,
    connection_id: &str,
    tx: &ClientSender,
    msg: ClientMessage,
) {
    // Codes that fail the format check can never name a room, so they are
    // rejected before touching the lock map.
    match msg {
        ClientMessage::JoinRoom(join) => {
            if !is_valid_room_code(&join.code) {
                tracing::info!(connection_id, room_code = %join.code, "Join rejected");
                send_error(tx, &AppError::RoomNotFound).await;
                return;
            }
            let _guard = state.room_locks.acquire(&join.code).await;
            if let Err(err) = state
                .coordinator
                .handle_join(connection_id, tx.clone(), &join)
                .await
            {
                tracing::info!(
                    connection_id,
                    room_code = %join.code,
                    code = err.code(),
                    "Join rejected"
                );
                send_error(tx, &err).await;
            }
        },
        ClientMessage::Heartbeat(hb) => {
            state
                .coordinator
                .handle_heartbeat(connection_id, hb.player_id)
                .await;
        },
        ClientMessage::StartGame(m) => {
            if !well_formed(connection_id, "start_game", &m.code) {
                return;
            }
            let _guard = state.room_locks.acquire(&m.code).await;
            let result = state.engine.start_game(connection_id, &m.code).await;
            finish_command(state, connection_id, tx, "start_game", &m.code, result).await;
        },
        ClientMessage::RollDice(m) => {
            if !well_formed(connection_id, "roll_dice", &m.code) {
                return;
            }
            let _guard = state.room_locks.acquire(&m.code).await;
            let result = state.engine.roll_dice(connection_id, &m.code).await;
            finish_command(state, connection_id, tx, "roll_dice", &m.code, result).await;
        },
        ClientMessage::BuyProperty(m) => {
            if !well_formed(connection_id, "buy_property", &m.code) {
                return;
            }
            let _guard = state.room_locks.acquire(&m.code).await;
            let result = state.engine.buy_property(connection_id, &m.code).await;
            finish_command(state, connection_id, tx, "buy_property", &m.code, result).await;
        },
        ClientMessage::EndTurn(m) => {
            if !well_formed(connection_id, "end_turn", &m.code) {
                return;
            }
            let _guard = state.room_locks.acquire(&m.code).await;
            let result = state.engine.end_turn(connection_id, &m.code).await;
            finish_command(state, connection_id, tx, "end_turn", &m.code, result).await;
        },
    }
}

/// Gameplay commands carrying a malformed code are dropped like any other
/// denied command under the default policy.
fn well_formed(connection_id: &str, command: &str, code: &str) -> bool {
    if is_valid_room_code(code) {
        return true;
    }
    tracing::debug!(connection_id, command, room_code = %code, "Malformed room code dropped");
    false
}

/// Apply the turn-denial policy to a command result. Applied commands have
/// already broadcast their own events; denials are dropped or echoed back
/// depending on configuration, and infrastructure errors always go back to
/// the sender.
async fn finish_command(
    state: &AppState,
    connection_id: &str,
    tx: &ClientSender,
    command: &str,
    room_code: &str,
    result: Result<CommandOutcome, AppError>,
) {
    match result {
        Ok(CommandOutcome::Applied) => {},
        Ok(CommandOutcome::Denied(reason)) => {
            tracing::debug!(connection_id, room_code, command, reason, "Command denied");
            if state.config.policy.turn_denial == TurnDenialPolicy::StrictError
                && let Some(frame) = encode_denial_event(reason)
            {
                let _ = tx.send(frame).await;
            }
        },
        Err(err) => {
            tracing::error!(connection_id, room_code, command, error = %err, "Command failed");
            send_error(tx, &err).await;
        },
    }
}

async fn send_error(tx: &ClientSender, err: &AppError) {
    if let Some(frame) = encode_error_event(err) {
        let _ = tx.send(frame).await;
    }
}
