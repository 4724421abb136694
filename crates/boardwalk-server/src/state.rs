use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use boardwalk_core::board::{BoardGenerator, LocalBoardGenerator};

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::coordinator::ConnectionCoordinator;
use crate::engine::TurnEngine;
use crate::locks::RoomLocks;
use crate::repository::{MemoryRepository, Repository};
use crate::session::SessionRegistry;

pub type SharedSessions = Arc<RwLock<SessionRegistry>>;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub sessions: SharedSessions,
    pub coordinator: Arc<ConnectionCoordinator>,
    pub engine: Arc<TurnEngine>,
    pub room_locks: Arc<RoomLocks>,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_parts(config, Arc::new(MemoryRepository::new()), Arc::new(LocalBoardGenerator))
    }

    /// Assembly seam: swap in a different repository or board generator.
    pub fn with_parts(
        config: ServerConfig,
        repo: Arc<dyn Repository>,
        board_gen: Arc<dyn BoardGenerator>,
    ) -> Self {
        let sessions: SharedSessions = Arc::new(RwLock::new(SessionRegistry::new()));
        let broadcaster = Broadcaster::new(Arc::clone(&sessions));
        let coordinator = Arc::new(ConnectionCoordinator::new(
            Arc::clone(&repo),
            Arc::clone(&sessions),
            broadcaster.clone(),
            config.rooms.clone(),
        ));
        let engine = Arc::new(TurnEngine::new(Arc::clone(&repo), broadcaster, board_gen));

        Self {
            repo,
            sessions,
            coordinator,
            engine,
            room_locks: Arc::new(RoomLocks::new()),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }
}

/// RAII counter for live WebSocket connections.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}
