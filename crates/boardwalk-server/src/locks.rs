use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as CommandMutex, OwnedMutexGuard};

/// Per-room command serialization.
///
/// The repository's read-modify-write is not transactional, so commands
/// for one room must never interleave: two concurrent rolls would lose an
/// update. Every room-scoped command handler holds the room's lock from
/// first read to last broadcast. Commands for different rooms proceed in
/// parallel.
///
/// Entries are evicted when the last holder releases, so codes that never
/// name a room (or rooms that go quiet) leave nothing behind; the map size
/// is bounded by the number of commands in flight.
#[derive(Default)]
pub struct RoomLocks {
    inner: Mutex<HashMap<String, Arc<CommandMutex<()>>>>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, room_code: &str) -> RoomGuard<'_> {
        let lock = {
            let mut map = self.lock_map();
            Arc::clone(map.entry(room_code.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        RoomGuard {
            locks: self,
            room_code: room_code.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of live lock entries (in-flight or contended commands).
    pub fn entry_count(&self) -> usize {
        self.lock_map().len()
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<String, Arc<CommandMutex<()>>>> {
        // The map lock is only ever held for a lookup or insert, so a
        // poisoned lock still guards a consistent map.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Holds one room's command lock; releasing it evicts the map entry when
/// nobody else is holding or awaiting the same room.
pub struct RoomGuard<'a> {
    locks: &'a RoomLocks,
    room_code: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RoomGuard<'_> {
    fn drop(&mut self) {
        // Release the command lock before inspecting the entry, so this
        // guard's own Arc handle is gone by the time the count is read.
        self.guard.take();
        let mut map = self.locks.lock_map();
        if let Some(entry) = map.get(&self.room_code)
            && Arc::strong_count(entry) == 1
        {
            map.remove(&self.room_code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn same_room_commands_are_serialized() {
        let locks = Arc::new(RoomLocks::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("A1B2C3").await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.entry_count(), 0);
    }

    #[tokio::test]
    async fn different_rooms_do_not_contend() {
        let locks = RoomLocks::new();
        let _a = locks.acquire("A1B2C3").await;
        // Must not deadlock while the first guard is held
        let _b = locks.acquire("Z9Y8X7").await;
        assert_eq!(locks.entry_count(), 2);
    }

    #[tokio::test]
    async fn released_entries_are_evicted() {
        let locks = RoomLocks::new();
        {
            let _guard = locks.acquire("A1B2C3").await;
            assert_eq!(locks.entry_count(), 1);
        }
        assert_eq!(locks.entry_count(), 0);
    }

    #[tokio::test]
    async fn distinct_codes_do_not_accumulate() {
        let locks = RoomLocks::new();
        for i in 0..100 {
            let _guard = locks.acquire(&format!("CODE{i:02}")).await;
        }
        assert_eq!(locks.entry_count(), 0);
    }

    #[tokio::test]
    async fn contended_entry_survives_until_the_last_release() {
        let locks = Arc::new(RoomLocks::new());
        let first = locks.acquire("A1B2C3").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("A1B2C3").await;
            })
        };
        // Let the waiter reach the lock before releasing
        tokio::task::yield_now().await;

        drop(first);
        waiter.await.unwrap();
        assert_eq!(locks.entry_count(), 0);
    }
}
