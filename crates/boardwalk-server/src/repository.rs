use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use boardwalk_core::game::GameState;
use boardwalk_core::player::Player;
use boardwalk_core::room::{Room, RoomStatus};
use boardwalk_core::time::timestamp_now;
use boardwalk_core::{PlayerId, RoomId};

#[derive(Debug, PartialEq, Eq)]
pub enum RepositoryError {
    RoomNotFound(RoomId),
    PlayerNotFound(PlayerId),
    InvalidStatusTransition(RoomStatus, RoomStatus),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoomNotFound(id) => write!(f, "room {id} not found"),
            Self::PlayerNotFound(id) => write!(f, "player {id} not found"),
            Self::InvalidStatusTransition(from, to) => {
                write!(f, "invalid room status transition: {from:?} -> {to:?}")
            },
        }
    }
}

impl std::error::Error for RepositoryError {}

/// Fields supplied when creating (or upserting) a player.
#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub room_id: RoomId,
    pub client_id: String,
    pub connection_id: Option<String>,
    pub nickname: String,
    pub color: String,
    pub is_host: bool,
    pub money: i64,
}

/// Partial player update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PlayerUpdate {
    pub nickname: Option<String>,
    pub money: Option<i64>,
    pub position: Option<u8>,
    pub is_host: Option<bool>,
    pub last_seen: Option<u64>,
}

/// Durable storage of Room and Player records. No business logic lives
/// here; the coordinator and engine own all validation. The trait is the
/// seam for swapping the in-memory engine for a durable store.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_room(&self, city: &str, code: &str, status: RoomStatus) -> Room;
    async fn get_room(&self, id: RoomId) -> Option<Room>;
    async fn get_room_by_code(&self, code: &str) -> Option<Room>;
    /// Enforces the one-directional `waiting → playing → finished` machine.
    async fn update_room_status(&self, id: RoomId, status: RoomStatus)
    -> Result<Room, RepositoryError>;
    async fn update_room_state(&self, id: RoomId, state: GameState)
    -> Result<Room, RepositoryError>;
    async fn update_room_host(&self, id: RoomId, host_id: PlayerId)
    -> Result<Room, RepositoryError>;

    async fn create_player(&self, fields: NewPlayer) -> Player;
    /// Stable order: creation order.
    async fn players_in_room(&self, room_id: RoomId) -> Vec<Player>;
    async fn get_player(&self, id: PlayerId) -> Option<Player>;
    async fn get_player_by_client_id(&self, client_id: &str, room_id: RoomId) -> Option<Player>;
    async fn get_player_by_connection(&self, connection_id: &str) -> Option<Player>;
    /// Keyed by `(room_id, client_id)`: refreshes nickname and `last_seen`
    /// when the identity already exists, creates otherwise. An existing
    /// connection handle is kept unless the caller supplies a new one, so a
    /// REST re-join never unbinds a live socket.
    async fn upsert_player(&self, fields: NewPlayer) -> Player;
    async fn update_player(&self, id: PlayerId, update: PlayerUpdate)
    -> Result<Player, RepositoryError>;
    /// Binds or clears the live connection handle, refreshing `last_seen`.
    async fn update_player_connection(
        &self,
        id: PlayerId,
        connection_id: Option<String>,
    ) -> Result<Player, RepositoryError>;
    async fn delete_player(&self, id: PlayerId);
}

#[derive(Default)]
struct Store {
    rooms: HashMap<RoomId, Room>,
    // BTreeMap keyed by ascending id keeps roster order = creation order.
    players: BTreeMap<PlayerId, Player>,
    next_room_id: RoomId,
    next_player_id: PlayerId,
}

/// In-memory repository engine.
#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_room(&self, city: &str, code: &str, status: RoomStatus) -> Room {
        let mut store = self.store.write().await;
        store.next_room_id += 1;
        let room = Room {
            id: store.next_room_id,
            code: code.to_string(),
            city: city.to_string(),
            status,
            host_id: None,
            game_state: None,
        };
        store.rooms.insert(room.id, room.clone());
        room
    }

    async fn get_room(&self, id: RoomId) -> Option<Room> {
        self.store.read().await.rooms.get(&id).cloned()
    }

    async fn get_room_by_code(&self, code: &str) -> Option<Room> {
        self.store
            .read()
            .await
            .rooms
            .values()
            .find(|r| r.code == code)
            .cloned()
    }

    async fn update_room_status(
        &self,
        id: RoomId,
        status: RoomStatus,
    ) -> Result<Room, RepositoryError> {
        let mut store = self.store.write().await;
        let room = store
            .rooms
            .get_mut(&id)
            .ok_or(RepositoryError::RoomNotFound(id))?;
        if !room.status.can_transition_to(status) {
            return Err(RepositoryError::InvalidStatusTransition(room.status, status));
        }
        room.status = status;
        Ok(room.clone())
    }

    async fn update_room_state(
        &self,
        id: RoomId,
        state: GameState,
    ) -> Result<Room, RepositoryError> {
        let mut store = self.store.write().await;
        let room = store
            .rooms
            .get_mut(&id)
            .ok_or(RepositoryError::RoomNotFound(id))?;
        room.game_state = Some(state);
        Ok(room.clone())
    }

    async fn update_room_host(
        &self,
        id: RoomId,
        host_id: PlayerId,
    ) -> Result<Room, RepositoryError> {
        let mut store = self.store.write().await;
        let room = store
            .rooms
            .get_mut(&id)
            .ok_or(RepositoryError::RoomNotFound(id))?;
        room.host_id = Some(host_id);
        Ok(room.clone())
    }

    async fn create_player(&self, fields: NewPlayer) -> Player {
        let mut store = self.store.write().await;
        store.next_player_id += 1;
        let player = Player {
            id: store.next_player_id,
            room_id: fields.room_id,
            client_id: fields.client_id,
            connection_id: fields.connection_id,
            nickname: fields.nickname,
            money: fields.money,
            position: 0,
            color: fields.color,
            is_host: fields.is_host,
            is_jailed: false,
            jail_turns: 0,
            last_seen: timestamp_now(),
        };
        store.players.insert(player.id, player.clone());
        player
    }

    async fn players_in_room(&self, room_id: RoomId) -> Vec<Player> {
        self.store
            .read()
            .await
            .players
            .values()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect()
    }

    async fn get_player(&self, id: PlayerId) -> Option<Player> {
        self.store.read().await.players.get(&id).cloned()
    }

    async fn get_player_by_client_id(&self, client_id: &str, room_id: RoomId) -> Option<Player> {
        self.store
            .read()
            .await
            .players
            .values()
            .find(|p| p.client_id == client_id && p.room_id == room_id)
            .cloned()
    }

    async fn get_player_by_connection(&self, connection_id: &str) -> Option<Player> {
        self.store
            .read()
            .await
            .players
            .values()
            .find(|p| p.connection_id.as_deref() == Some(connection_id))
            .cloned()
    }

    async fn upsert_player(&self, fields: NewPlayer) -> Player {
        {
            let mut store = self.store.write().await;
            let existing = store
                .players
                .values_mut()
                .find(|p| p.client_id == fields.client_id && p.room_id == fields.room_id);
            if let Some(player) = existing {
                player.nickname = fields.nickname;
                if fields.connection_id.is_some() {
                    player.connection_id = fields.connection_id;
                }
                player.last_seen = timestamp_now();
                return player.clone();
            }
        }
        self.create_player(fields).await
    }

    async fn update_player(
        &self,
        id: PlayerId,
        update: PlayerUpdate,
    ) -> Result<Player, RepositoryError> {
        let mut store = self.store.write().await;
        let player = store
            .players
            .get_mut(&id)
            .ok_or(RepositoryError::PlayerNotFound(id))?;
        if let Some(nickname) = update.nickname {
            player.nickname = nickname;
        }
        if let Some(money) = update.money {
            player.money = money;
        }
        if let Some(position) = update.position {
            player.position = position;
        }
        if let Some(is_host) = update.is_host {
            player.is_host = is_host;
        }
        if let Some(last_seen) = update.last_seen {
            player.last_seen = last_seen;
        }
        Ok(player.clone())
    }

    async fn update_player_connection(
        &self,
        id: PlayerId,
        connection_id: Option<String>,
    ) -> Result<Player, RepositoryError> {
        let mut store = self.store.write().await;
        let player = store
            .players
            .get_mut(&id)
            .ok_or(RepositoryError::PlayerNotFound(id))?;
        player.connection_id = connection_id;
        player.last_seen = timestamp_now();
        Ok(player.clone())
    }

    async fn delete_player(&self, id: PlayerId) {
        self.store.write().await.players.remove(&id);
    }
}
