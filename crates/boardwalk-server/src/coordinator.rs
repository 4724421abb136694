use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use boardwalk_core::net::messages::JoinRoomMsg;
use boardwalk_core::player::{Player, random_color};
use boardwalk_core::room::{Room, RoomStatus, generate_room_code};
use boardwalk_core::time::timestamp_now;
use boardwalk_core::PlayerId;

use crate::broadcast::Broadcaster;
use crate::config::RoomsConfig;
use crate::error::AppError;
use crate::repository::{NewPlayer, PlayerUpdate, Repository};
use crate::session::{ClientSender, SessionRegistry};

/// Owns the membership lifecycle: REST room creation and joining, the
/// realtime join handshake, heartbeats, and disconnect handling with host
/// migration and delayed eviction.
///
/// Identity is two-layered. `client_id` is the durable identity a client
/// keeps across reloads; `connection_id` is the handle of whichever socket
/// currently speaks for that player, and is cleared on disconnect. A player
/// record outlives its connections.
pub struct ConnectionCoordinator {
    repo: Arc<dyn Repository>,
    sessions: Arc<RwLock<SessionRegistry>>,
    broadcaster: Broadcaster,
    rooms: RoomsConfig,
}

impl ConnectionCoordinator {
    pub fn new(
        repo: Arc<dyn Repository>,
        sessions: Arc<RwLock<SessionRegistry>>,
        broadcaster: Broadcaster,
        rooms: RoomsConfig,
    ) -> Self {
        Self {
            repo,
            sessions,
            broadcaster,
            rooms,
        }
    }

    /// Create a room and its host player. The creator is always the host.
    pub async fn create_room(
        &self,
        city: &str,
        nickname: &str,
        client_id: &str,
    ) -> Result<(Room, Player), AppError> {
        let code = self.unique_room_code().await;
        let room = self.repo.create_room(city, &code, RoomStatus::Waiting).await;
        let host = self
            .repo
            .create_player(NewPlayer {
                room_id: room.id,
                client_id: client_id.to_string(),
                connection_id: None,
                nickname: nickname.to_string(),
                color: random_color(),
                is_host: true,
                money: self.rooms.starting_money,
            })
            .await;
        let room = self
            .repo
            .update_room_host(room.id, host.id)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::info!(
            room_code = %room.code,
            city = %room.city,
            host_id = host.id,
            "Room created"
        );
        Ok((room, host))
    }

    /// Join (or re-join) a room over REST. Upserts by `(room, client_id)`:
    /// a returning identity gets its existing record refreshed instead of a
    /// duplicate, and is admitted even mid-game so reconnection can proceed.
    pub async fn join_room(
        &self,
        code: &str,
        nickname: &str,
        client_id: &str,
    ) -> Result<(Room, Player), AppError> {
        let room = self
            .repo
            .get_room_by_code(code)
            .await
            .ok_or(AppError::RoomNotFound)?;

        let existing = self.repo.get_player_by_client_id(client_id, room.id).await;
        if existing.is_none() {
            if room.status != RoomStatus::Waiting {
                return Err(AppError::GameAlreadyStarted);
            }
            let roster = self.repo.players_in_room(room.id).await;
            if roster.len() >= self.rooms.max_players {
                return Err(AppError::RoomFull);
            }
        }

        let player = self
            .repo
            .upsert_player(NewPlayer {
                room_id: room.id,
                client_id: client_id.to_string(),
                connection_id: None,
                nickname: nickname.to_string(),
                color: random_color(),
                is_host: false,
                money: self.rooms.starting_money,
            })
            .await;

        tracing::info!(
            room_code = %room.code,
            player_id = player.id,
            nickname = %player.nickname,
            "Player joined room"
        );
        Ok((room, player))
    }

    pub async fn room_snapshot(&self, code: &str) -> Result<(Room, Vec<Player>), AppError> {
        let room = self
            .repo
            .get_room_by_code(code)
            .await
            .ok_or(AppError::RoomNotFound)?;
        let players = self.repo.players_in_room(room.id).await;
        Ok((room, players))
    }

    /// Realtime join handshake. Validates the claimed identity against the
    /// stored record, binds the connection, and converges the roster. Every
    /// failure is surfaced as an error event to the joiner alone; nothing is
    /// mutated or broadcast on failure.
    pub async fn handle_join(
        &self,
        connection_id: &str,
        sender: ClientSender,
        msg: &JoinRoomMsg,
    ) -> Result<(), AppError> {
        let room = self
            .repo
            .get_room_by_code(&msg.code)
            .await
            .ok_or(AppError::RoomNotFound)?;
        let player = self
            .repo
            .get_player(msg.player_id)
            .await
            .ok_or_else(|| AppError::InvalidPlayer("unknown player".to_string()))?;
        if player.client_id != msg.client_id {
            return Err(AppError::InvalidPlayer("client id mismatch".to_string()));
        }
        if player.room_id != room.id {
            return Err(AppError::InvalidPlayer("player not in this room".to_string()));
        }

        let player = self
            .repo
            .update_player_connection(player.id, Some(connection_id.to_string()))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        self.sessions
            .write()
            .await
            .bind(connection_id, &room.code, player.id, sender);

        tracing::info!(
            room_code = %room.code,
            player_id = player.id,
            connection_id,
            "Connection bound"
        );

        // A room can be left hostless if its host was evicted while nobody
        // was connected; the first successful joiner inherits the role.
        let mut roster = self.repo.players_in_room(room.id).await;
        if !roster.iter().any(|p| p.is_host) {
            let promoted = self
                .repo
                .update_player(
                    player.id,
                    PlayerUpdate {
                        is_host: Some(true),
                        ..PlayerUpdate::default()
                    },
                )
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
            self.repo
                .update_room_host(room.id, promoted.id)
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
            roster = self.repo.players_in_room(room.id).await;
            self.broadcaster
                .host_changed(&room.code, promoted.id, promoted.nickname.clone())
                .await;
        }

        let joined = roster
            .iter()
            .find(|p| p.id == player.id)
            .cloned()
            .unwrap_or(player);
        self.broadcaster
            .player_joined(&room.code, joined, roster)
            .await;
        Ok(())
    }

    /// Liveness ping. Only the connection bound to the player may refresh
    /// its `last_seen`; heartbeats naming anyone else (or arriving before
    /// the join handshake) are ignored. A heartbeat racing an eviction is
    /// not an error either.
    pub async fn handle_heartbeat(&self, connection_id: &str, player_id: PlayerId) {
        let owned = self
            .sessions
            .read()
            .await
            .resolve(connection_id)
            .is_some_and(|s| s.player_id == player_id);
        if !owned {
            tracing::debug!(connection_id, player_id, "Heartbeat from non-owner ignored");
            return;
        }

        let update = PlayerUpdate {
            last_seen: Some(timestamp_now()),
            ..PlayerUpdate::default()
        };
        if self.repo.update_player(player_id, update).await.is_err() {
            tracing::debug!(player_id, "Heartbeat for unknown player ignored");
        }
    }

    /// Tear down a closed connection: clear the player's connection handle,
    /// announce the disconnect, migrate the host role if needed, and start
    /// the eviction clock. The player record itself survives the grace
    /// window so the same `client_id` can reconnect.
    pub async fn handle_disconnect(&self, connection_id: &str) {
        self.sessions.write().await.unbind(connection_id);

        let Some(player) = self.repo.get_player_by_connection(connection_id).await else {
            return;
        };
        let Some(room) = self.repo.get_room(player.room_id).await else {
            return;
        };

        // The record may already be bound to a newer socket by the time this
        // runs; only clear the handle we own.
        if self
            .repo
            .update_player_connection(player.id, None)
            .await
            .is_err()
        {
            return;
        }

        tracing::info!(
            room_code = %room.code,
            player_id = player.id,
            nickname = %player.nickname,
            "Player disconnected"
        );
        self.broadcaster
            .player_disconnected(&room.code, player.id, player.nickname.clone())
            .await;

        if player.is_host {
            self.migrate_host(&room, player.id).await;
        }

        self.schedule_eviction(player.id, room.code.clone());
    }

    /// Hand the host role to the first connected player in roster order.
    /// With nobody connected the role stays put; the disconnected host keeps
    /// it if they return within the grace window.
    async fn migrate_host(&self, room: &Room, old_host_id: PlayerId) {
        let roster = self.repo.players_in_room(room.id).await;
        let Some(successor) = roster
            .iter()
            .find(|p| p.id != old_host_id && p.is_connected())
        else {
            return;
        };

        let demote = self
            .repo
            .update_player(
                old_host_id,
                PlayerUpdate {
                    is_host: Some(false),
                    ..PlayerUpdate::default()
                },
            )
            .await;
        let promote = self
            .repo
            .update_player(
                successor.id,
                PlayerUpdate {
                    is_host: Some(true),
                    ..PlayerUpdate::default()
                },
            )
            .await;
        if demote.is_err() || promote.is_err() {
            tracing::warn!(room_code = %room.code, "Host migration hit a missing player");
            return;
        }
        if let Err(e) = self.repo.update_room_host(room.id, successor.id).await {
            tracing::warn!(room_code = %room.code, error = %e, "Failed to record new host");
            return;
        }

        tracing::info!(
            room_code = %room.code,
            old_host_id,
            new_host_id = successor.id,
            "Host migrated"
        );
        self.broadcaster
            .host_changed(&room.code, successor.id, successor.nickname.clone())
            .await;
    }

    /// Arm the eviction timer. The timer is never cancelled; it re-checks
    /// liveness when it fires, so a reconnect within the window simply makes
    /// it a no-op.
    fn schedule_eviction(&self, player_id: PlayerId, room_code: String) {
        let repo = Arc::clone(&self.repo);
        let grace = Duration::from_secs(self.rooms.eviction_grace_secs);
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let Some(player) = repo.get_player(player_id).await else {
                return;
            };
            if player.is_connected() {
                return;
            }
            repo.delete_player(player_id).await;
            tracing::info!(
                room_code = %room_code,
                player_id,
                nickname = %player.nickname,
                "Evicted player after grace window"
            );
        });
    }

    async fn unique_room_code(&self) -> String {
        loop {
            let code = generate_room_code();
            if self.repo.get_room_by_code(&code).await.is_none() {
                return code;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use boardwalk_core::net::messages::{MessageType, ServerMessage};
    use boardwalk_core::net::protocol::decode_server_message;
    use bytes::Bytes;
    use tokio::sync::mpsc;

    fn coordinator() -> (ConnectionCoordinator, Arc<RwLock<SessionRegistry>>, Arc<dyn Repository>) {
        let repo: Arc<dyn Repository> = Arc::new(MemoryRepository::new());
        let sessions = Arc::new(RwLock::new(SessionRegistry::new()));
        let broadcaster = Broadcaster::new(Arc::clone(&sessions));
        let coord = ConnectionCoordinator::new(
            Arc::clone(&repo),
            Arc::clone(&sessions),
            broadcaster,
            RoomsConfig::default(),
        );
        (coord, sessions, repo)
    }

    fn decode(frame: Bytes) -> ServerMessage {
        decode_server_message(&frame).unwrap()
    }

    async fn join(
        coord: &ConnectionCoordinator,
        conn_id: &str,
        code: &str,
        player: &Player,
    ) -> (mpsc::Receiver<Bytes>, Result<(), AppError>) {
        let (tx, rx) = mpsc::channel(16);
        let result = coord
            .handle_join(
                conn_id,
                tx,
                &JoinRoomMsg {
                    code: code.to_string(),
                    player_id: player.id,
                    client_id: player.client_id.clone(),
                    nickname: player.nickname.clone(),
                },
            )
            .await;
        (rx, result)
    }

    #[tokio::test]
    async fn create_room_makes_creator_host() {
        let (coord, _, _) = coordinator();
        let (room, host) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.host_id, Some(host.id));
        assert!(host.is_host);
        assert_eq!(host.money, 2000);
        assert_eq!(room.code.len(), 6);
    }

    #[tokio::test]
    async fn join_room_upserts_by_client_id() {
        let (coord, _, repo) = coordinator();
        let (room, _) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();

        let (_, bob) = coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        let (_, bob_again) = coord.join_room(&room.code, "Bobby", "c-b").await.unwrap();
        assert_eq!(bob.id, bob_again.id);
        assert_eq!(bob_again.nickname, "Bobby");
        assert_eq!(repo.players_in_room(room.id).await.len(), 2);
    }

    #[tokio::test]
    async fn join_room_enforces_capacity() {
        let (coord, _, _) = coordinator();
        let (room, _) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        coord.join_room(&room.code, "Cleo", "c-c").await.unwrap();
        coord.join_room(&room.code, "Dave", "c-d").await.unwrap();

        let err = coord.join_room(&room.code, "Eve", "c-e").await.unwrap_err();
        assert_eq!(err, AppError::RoomFull);

        // Returning identities are not counted against capacity
        assert!(coord.join_room(&room.code, "Bob", "c-b").await.is_ok());
    }

    #[tokio::test]
    async fn join_room_rejects_new_players_mid_game() {
        let (coord, _, repo) = coordinator();
        let (room, _) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        repo.update_room_status(room.id, RoomStatus::Playing)
            .await
            .unwrap();

        let err = coord.join_room(&room.code, "Eve", "c-e").await.unwrap_err();
        assert_eq!(err, AppError::GameAlreadyStarted);

        // A known identity can still come back to reconnect
        assert!(coord.join_room(&room.code, "Bob", "c-b").await.is_ok());
    }

    #[tokio::test]
    async fn join_room_unknown_code() {
        let (coord, _, _) = coordinator();
        let err = coord.join_room("ZZZZZZ", "Eve", "c-e").await.unwrap_err();
        assert_eq!(err, AppError::RoomNotFound);
    }

    #[tokio::test]
    async fn handshake_binds_and_broadcasts_roster() {
        let (coord, sessions, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (_, bob) = coord.join_room(&room.code, "Bob", "c-b").await.unwrap();

        let (mut rx_a, res) = join(&coord, "conn-a", &room.code, &alice).await;
        res.unwrap();
        let (mut rx_b, res) = join(&coord, "conn-b", &room.code, &bob).await;
        res.unwrap();

        assert_eq!(sessions.read().await.member_count(&room.code), 2);
        let stored = repo.get_player(alice.id).await.unwrap();
        assert_eq!(stored.connection_id.as_deref(), Some("conn-a"));

        // Alice sees her own join and Bob's; Bob sees his own
        let first = decode(rx_a.recv().await.unwrap());
        assert_eq!(first.message_type(), MessageType::PlayerJoined);
        let second = decode(rx_a.recv().await.unwrap());
        let ServerMessage::PlayerJoined(msg) = second else {
            panic!("expected player_joined");
        };
        assert_eq!(msg.player.id, bob.id);
        assert_eq!(msg.players.len(), 2);

        let own = decode(rx_b.recv().await.unwrap());
        assert_eq!(own.message_type(), MessageType::PlayerJoined);
    }

    #[tokio::test]
    async fn handshake_rejects_client_id_mismatch() {
        let (coord, sessions, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();

        let (tx, _rx) = mpsc::channel(16);
        let err = coord
            .handle_join(
                "conn-x",
                tx,
                &JoinRoomMsg {
                    code: room.code.clone(),
                    player_id: alice.id,
                    client_id: "c-impostor".to_string(),
                    nickname: "Alice".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, AppError::InvalidPlayer("client id mismatch".to_string()));

        // Nothing bound, nothing mutated
        assert_eq!(sessions.read().await.member_count(&room.code), 0);
        let stored = repo.get_player(alice.id).await.unwrap();
        assert!(stored.connection_id.is_none());
    }

    #[tokio::test]
    async fn handshake_rejects_wrong_room() {
        let (coord, _, _) = coordinator();
        let (_, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (other, _) = coord.create_room("Shelbyville", "Zed", "c-z").await.unwrap();

        let (_, res) = join(&coord, "conn-a", &other.code, &alice).await;
        assert_eq!(
            res.unwrap_err(),
            AppError::InvalidPlayer("player not in this room".to_string())
        );
    }

    #[tokio::test]
    async fn handshake_rejects_unknown_room_and_player() {
        let (coord, _, _) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();

        let mut ghost = alice.clone();
        ghost.id = 999;
        let (_, res) = join(&coord, "conn-a", &room.code, &ghost).await;
        assert_eq!(
            res.unwrap_err(),
            AppError::InvalidPlayer("unknown player".to_string())
        );

        let (_, res) = join(&coord, "conn-a", "ZZZZZZ", &alice).await;
        assert_eq!(res.unwrap_err(), AppError::RoomNotFound);
    }

    #[tokio::test]
    async fn handshake_promotes_host_when_room_is_hostless() {
        let (coord, _, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (_, bob) = coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        // Simulate the host having been evicted while nobody was around
        repo.delete_player(alice.id).await;

        let (mut rx, res) = join(&coord, "conn-b", &room.code, &bob).await;
        res.unwrap();

        let stored = repo.get_player(bob.id).await.unwrap();
        assert!(stored.is_host);
        assert_eq!(repo.get_room(room.id).await.unwrap().host_id, Some(bob.id));

        let first = decode(rx.recv().await.unwrap());
        assert_eq!(first.message_type(), MessageType::HostChanged);
        let second = decode(rx.recv().await.unwrap());
        assert_eq!(second.message_type(), MessageType::PlayerJoined);
    }

    #[tokio::test]
    async fn heartbeat_refreshes_last_seen_for_the_owning_connection() {
        let (coord, _, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (_rx, res) = join(&coord, "conn-a", &room.code, &alice).await;
        res.unwrap();
        repo.update_player(
            alice.id,
            PlayerUpdate {
                last_seen: Some(1),
                ..PlayerUpdate::default()
            },
        )
        .await
        .unwrap();

        coord.handle_heartbeat("conn-a", alice.id).await;
        assert!(repo.get_player(alice.id).await.unwrap().last_seen > 1);

        // Unknown player is a no-op, not a panic
        coord.handle_heartbeat("conn-a", 999).await;
    }

    #[tokio::test]
    async fn heartbeat_from_non_owner_is_ignored() {
        let (coord, _, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (_, bob) = coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        let (_rx_a, res) = join(&coord, "conn-a", &room.code, &alice).await;
        res.unwrap();
        let (_rx_b, res) = join(&coord, "conn-b", &room.code, &bob).await;
        res.unwrap();
        repo.update_player(
            alice.id,
            PlayerUpdate {
                last_seen: Some(1),
                ..PlayerUpdate::default()
            },
        )
        .await
        .unwrap();

        // Bob's socket cannot keep Alice fresh, nor can an unbound one
        coord.handle_heartbeat("conn-b", alice.id).await;
        coord.handle_heartbeat("conn-never-joined", alice.id).await;
        assert_eq!(repo.get_player(alice.id).await.unwrap().last_seen, 1);
    }

    #[tokio::test]
    async fn rest_rejoin_keeps_the_live_connection_binding() {
        let (coord, _, repo) = coordinator();
        let (room, _) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (_, bob) = coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        let (_rx_b, res) = join(&coord, "conn-b", &room.code, &bob).await;
        res.unwrap();

        // Page reload: the REST join lands while the old socket is still open
        let (_, refreshed) = coord.join_room(&room.code, "Bobby", "c-b").await.unwrap();
        assert_eq!(refreshed.connection_id.as_deref(), Some("conn-b"));

        // The old socket's close still tears the binding down properly
        coord.handle_disconnect("conn-b").await;
        let stored = repo.get_player(bob.id).await.unwrap();
        assert!(stored.connection_id.is_none());
    }

    #[tokio::test]
    async fn disconnect_clears_connection_and_announces() {
        let (coord, sessions, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (_, bob) = coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        let (_rx_a, res) = join(&coord, "conn-a", &room.code, &alice).await;
        res.unwrap();
        let (mut rx_b, res) = join(&coord, "conn-b", &room.code, &bob).await;
        res.unwrap();
        while rx_b.try_recv().is_ok() {}

        coord.handle_disconnect("conn-b").await;

        assert_eq!(sessions.read().await.member_count(&room.code), 1);
        let stored = repo.get_player(bob.id).await.unwrap();
        assert!(stored.connection_id.is_none());
        // Bob was not the host, so the role stays with Alice
        assert!(repo.get_player(alice.id).await.unwrap().is_host);
    }

    #[tokio::test]
    async fn host_disconnect_migrates_to_first_connected() {
        let (coord, _, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (_, bob) = coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        let (_rx_a, res) = join(&coord, "conn-a", &room.code, &alice).await;
        res.unwrap();
        let (mut rx_b, res) = join(&coord, "conn-b", &room.code, &bob).await;
        res.unwrap();
        while rx_b.try_recv().is_ok() {}

        coord.handle_disconnect("conn-a").await;

        assert!(!repo.get_player(alice.id).await.unwrap().is_host);
        assert!(repo.get_player(bob.id).await.unwrap().is_host);
        assert_eq!(repo.get_room(room.id).await.unwrap().host_id, Some(bob.id));

        let first = decode(rx_b.recv().await.unwrap());
        assert_eq!(first.message_type(), MessageType::PlayerDisconnected);
        let second = decode(rx_b.recv().await.unwrap());
        let ServerMessage::HostChanged(msg) = second else {
            panic!("expected host_changed");
        };
        assert_eq!(msg.new_host_id, bob.id);
    }

    #[tokio::test]
    async fn host_disconnect_without_candidate_keeps_role() {
        let (coord, _, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        let (_rx_a, res) = join(&coord, "conn-a", &room.code, &alice).await;
        res.unwrap();

        // Bob never connected, so there is nobody to hand the role to
        coord.handle_disconnect("conn-a").await;
        assert!(repo.get_player(alice.id).await.unwrap().is_host);
    }

    #[tokio::test]
    async fn disconnect_for_unknown_connection_is_a_noop() {
        let (coord, _, _) = coordinator();
        coord.handle_disconnect("conn-never-seen").await;
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_fires_after_grace_window() {
        let (coord, _, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (_, bob) = coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        let (_rx_a, res) = join(&coord, "conn-a", &room.code, &alice).await;
        res.unwrap();
        let (_rx_b, res) = join(&coord, "conn-b", &room.code, &bob).await;
        res.unwrap();

        coord.handle_disconnect("conn-b").await;
        assert!(repo.get_player(bob.id).await.is_some());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(repo.get_player(bob.id).await.is_none());
        assert!(repo.get_player(alice.id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_within_grace_cancels_eviction() {
        let (coord, _, repo) = coordinator();
        let (room, alice) = coord.create_room("Springfield", "Alice", "c-a").await.unwrap();
        let (_, bob) = coord.join_room(&room.code, "Bob", "c-b").await.unwrap();
        let (_rx_a, res) = join(&coord, "conn-a", &room.code, &alice).await;
        res.unwrap();
        let (_rx_b, res) = join(&coord, "conn-b", &room.code, &bob).await;
        res.unwrap();

        coord.handle_disconnect("conn-b").await;
        tokio::time::sleep(Duration::from_secs(30)).await;

        // Bob comes back on a fresh socket before the timer fires
        let (_rx_b2, res) = join(&coord, "conn-b2", &room.code, &bob).await;
        res.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        let stored = repo.get_player(bob.id).await.unwrap();
        assert_eq!(stored.connection_id.as_deref(), Some("conn-b2"));
    }
}
