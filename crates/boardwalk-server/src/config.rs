use serde::Deserialize;

/// Top-level server configuration, loaded from `boardwalk.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    pub rooms: RoomsConfig,
    pub policy: PolicyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            limits: LimitsConfig::default(),
            rooms: RoomsConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Outbound message buffer per connection; slow clients that fall
    /// behind this many messages get broadcasts dropped.
    pub player_message_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 256,
        }
    }
}

/// Room and session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub max_players: usize,
    /// Grace window after a disconnect before the player record is
    /// deleted, in seconds.
    pub eviction_grace_secs: u64,
    pub starting_money: i64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            max_players: 4,
            eviction_grace_secs: 60,
            starting_money: boardwalk_core::player::STARTING_MONEY,
        }
    }
}

/// What happens when a turn-bound command fails authorization (wrong turn,
/// not host, invalid purchase). Identity failures on join are always
/// surfaced as errors regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TurnDenialPolicy {
    /// Drop the command without feedback (matches the original behavior;
    /// clients are trusted to gate invalid actions in the UI).
    #[default]
    SilentDrop,
    /// Emit an `error` event naming the denial reason.
    StrictError,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub turn_denial: TurnDenialPolicy,
}

impl ServerConfig {
    /// Validate configuration, exiting on values the server cannot run with.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }
        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.rooms.max_players == 0 {
            tracing::error!("rooms.max_players must be > 0");
            std::process::exit(1);
        }
        if self.rooms.eviction_grace_secs == 0 {
            tracing::error!("rooms.eviction_grace_secs must be > 0");
            std::process::exit(1);
        }
        if self.rooms.starting_money <= 0 {
            tracing::error!("rooms.starting_money must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `boardwalk.toml` if it exists, then apply env var
    /// overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("boardwalk.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from boardwalk.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse boardwalk.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No boardwalk.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("BOARDWALK_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(val) = std::env::var("BOARDWALK_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("BOARDWALK_MAX_PLAYERS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.rooms.max_players = n;
        }
        if let Ok(val) = std::env::var("BOARDWALK_EVICTION_GRACE_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.rooms.eviction_grace_secs = n;
        }

        config
    }
}
