/// Returns the current Unix epoch time in milliseconds.
/// Used for `last_seen` heartbeats and game-state write stamps.
pub fn timestamp_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
