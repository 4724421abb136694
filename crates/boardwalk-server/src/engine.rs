use std::sync::Arc;

use rand::Rng;

use boardwalk_core::board::{BOARD_SIZE, BoardGenerator};
use boardwalk_core::game::{GameState, advance_position};
use boardwalk_core::player::Player;
use boardwalk_core::room::{Room, RoomStatus};

use crate::broadcast::Broadcaster;
use crate::error::AppError;
use crate::repository::{PlayerUpdate, Repository};

/// What became of a gameplay command.
///
/// Denials are distinct from errors: an out-of-turn roll or an invalid
/// purchase is a normal occurrence (a stale client, a mistimed click) and
/// the default policy drops it without feedback. Only infrastructure
/// failures surface as [`AppError`].
#[derive(Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Denied(&'static str),
}

struct TurnContext {
    room: Room,
    roster: Vec<Player>,
    state: GameState,
    current: Player,
}

/// The turn-authority engine. Holds all gameplay rules: who may start the
/// game, whose connection may act, and what a roll, purchase, or turn pass
/// does to the state. Callers serialize commands per room before invoking.
pub struct TurnEngine {
    repo: Arc<dyn Repository>,
    broadcaster: Broadcaster,
    board_gen: Arc<dyn BoardGenerator>,
}

impl TurnEngine {
    pub fn new(
        repo: Arc<dyn Repository>,
        broadcaster: Broadcaster,
        board_gen: Arc<dyn BoardGenerator>,
    ) -> Self {
        Self {
            repo,
            broadcaster,
            board_gen,
        }
    }

    /// Host-only. Generates the board, flips the room to `playing`, and
    /// announces the initial state.
    pub async fn start_game(
        &self,
        connection_id: &str,
        code: &str,
    ) -> Result<CommandOutcome, AppError> {
        let Some(room) = self.repo.get_room_by_code(code).await else {
            return Ok(CommandOutcome::Denied("room not found"));
        };
        let Some(player) = self.repo.get_player_by_connection(connection_id).await else {
            return Ok(CommandOutcome::Denied("connection has not joined"));
        };
        if player.room_id != room.id || !player.is_host {
            return Ok(CommandOutcome::Denied("only the host can start the game"));
        }
        if room.status != RoomStatus::Waiting {
            return Ok(CommandOutcome::Denied("game already started"));
        }

        let board = self.board_gen.generate(&room.city);
        if board.len() != BOARD_SIZE {
            return Err(AppError::Internal(format!(
                "board generator returned {} tiles",
                board.len()
            )));
        }
        let state = GameState::new(board, &room.city);

        self.repo
            .update_room_status(room.id, RoomStatus::Playing)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        self.repo
            .update_room_state(room.id, state.clone())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::info!(room_code = %room.code, host_id = player.id, "Game started");
        self.broadcaster.game_started(&room.code, state).await;
        Ok(CommandOutcome::Applied)
    }

    /// Roll two dice for the acting player, move them along the track, and
    /// push the updated state. Never idempotent; every applied roll moves.
    pub async fn roll_dice(
        &self,
        connection_id: &str,
        code: &str,
    ) -> Result<CommandOutcome, AppError> {
        let mut ctx = match self.acting_context(connection_id, code).await? {
            Ok(ctx) => ctx,
            Err(reason) => return Ok(CommandOutcome::Denied(reason)),
        };

        let (d1, d2) = {
            let mut rng = rand::rng();
            (rng.random_range(1..=6u8), rng.random_range(1..=6u8))
        };
        let new_position = advance_position(ctx.current.position, d1, d2);
        let landed = ctx.state.board[new_position as usize].name.clone();

        ctx.state.dice = [d1, d2];
        ctx.state.append_log(format!(
            "{} rolled {} and landed on {}",
            ctx.current.nickname,
            d1 + d2,
            landed
        ));
        ctx.state.touch();

        self.repo
            .update_player(
                ctx.current.id,
                PlayerUpdate {
                    position: Some(new_position),
                    ..PlayerUpdate::default()
                },
            )
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        self.repo
            .update_room_state(ctx.room.id, ctx.state.clone())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::debug!(
            room_code = %ctx.room.code,
            player_id = ctx.current.id,
            dice = ?[d1, d2],
            position = new_position,
            "Dice rolled"
        );
        self.broadcaster.game_update(&ctx.room.code, ctx.state).await;
        Ok(CommandOutcome::Applied)
    }

    /// Buy the tile under the acting player, if it is an unowned street they
    /// can afford.
    pub async fn buy_property(
        &self,
        connection_id: &str,
        code: &str,
    ) -> Result<CommandOutcome, AppError> {
        let mut ctx = match self.acting_context(connection_id, code).await? {
            Ok(ctx) => ctx,
            Err(reason) => return Ok(CommandOutcome::Denied(reason)),
        };

        let slot = ctx.current.position as usize;
        let tile = &ctx.state.board[slot];
        if !tile.is_purchasable() {
            return Ok(CommandOutcome::Denied("tile cannot be bought"));
        }
        let Some(price) = tile.price else {
            return Ok(CommandOutcome::Denied("tile cannot be bought"));
        };
        if ctx.current.money < price {
            return Ok(CommandOutcome::Denied("insufficient funds"));
        }

        let name = tile.name.clone();
        ctx.state.board[slot].owner_id = Some(ctx.current.id);
        ctx.state.append_log(format!(
            "{} bought {} for {}",
            ctx.current.nickname, name, price
        ));
        ctx.state.touch();

        self.repo
            .update_player(
                ctx.current.id,
                PlayerUpdate {
                    money: Some(ctx.current.money - price),
                    ..PlayerUpdate::default()
                },
            )
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        self.repo
            .update_room_state(ctx.room.id, ctx.state.clone())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::debug!(
            room_code = %ctx.room.code,
            player_id = ctx.current.id,
            slot,
            price,
            "Property bought"
        );
        self.broadcaster.game_update(&ctx.room.code, ctx.state).await;
        Ok(CommandOutcome::Applied)
    }

    /// Pass the turn to the next player in roster order. Dice are left
    /// showing the previous roll until the next player rolls.
    pub async fn end_turn(
        &self,
        connection_id: &str,
        code: &str,
    ) -> Result<CommandOutcome, AppError> {
        let mut ctx = match self.acting_context(connection_id, code).await? {
            Ok(ctx) => ctx,
            Err(reason) => return Ok(CommandOutcome::Denied(reason)),
        };

        let next_index = (ctx.state.current_player_index + 1) % ctx.roster.len();
        let next = &ctx.roster[next_index];
        ctx.state.current_player_index = next_index;
        ctx.state
            .append_log(format!("It is now {}'s turn", next.nickname));
        ctx.state.touch();

        self.repo
            .update_room_state(ctx.room.id, ctx.state.clone())
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::debug!(
            room_code = %ctx.room.code,
            player_id = ctx.current.id,
            next_player_id = next.id,
            "Turn ended"
        );
        self.broadcaster.game_update(&ctx.room.code, ctx.state).await;
        Ok(CommandOutcome::Applied)
    }

    /// Load everything a turn-bound command needs and check turn authority:
    /// the room must be `playing` and the invoking connection must be the
    /// one bound to the roster entry at `current_player_index`.
    async fn acting_context(
        &self,
        connection_id: &str,
        code: &str,
    ) -> Result<Result<TurnContext, &'static str>, AppError> {
        let Some(room) = self.repo.get_room_by_code(code).await else {
            return Ok(Err("room not found"));
        };
        if room.status != RoomStatus::Playing {
            return Ok(Err("game is not in progress"));
        }
        let Some(state) = room.game_state.clone() else {
            return Ok(Err("game is not in progress"));
        };

        let roster = self.repo.players_in_room(room.id).await;
        let Some(current) = roster.get(state.current_player_index).cloned() else {
            // The player whose turn it is was evicted; nobody can act until
            // the index is advanced out of band.
            return Ok(Err("no player holds the turn"));
        };
        if current.connection_id.as_deref() != Some(connection_id) {
            return Ok(Err("not this connection's turn"));
        }

        Ok(Ok(TurnContext {
            room,
            roster,
            state,
            current,
        }))
    }
}
