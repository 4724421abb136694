pub mod board;
pub mod game;
pub mod net;
pub mod player;
pub mod room;
pub mod time;

/// Durable player key, assigned by the repository at creation.
pub type PlayerId = i64;

/// Durable room key.
pub type RoomId = i64;
