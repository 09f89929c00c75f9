//! Per-room serialization of sync work.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::RoomId;

/// One async mutex per room.
///
/// Holding a room's guard makes the read of its power levels, the decision and
/// the resulting state write a single unit with respect to other triggers for
/// the same room. Different rooms never block each other.
#[derive(Debug, Default)]
pub struct RoomLocks {
    locks: DashMap<RoomId, Arc<Mutex<()>>>,
}

impl RoomLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, room_id: &RoomId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(&self.locks.entry(room_id.clone()).or_default());
        lock.lock_owned().await
    }

    /// Number of rooms that have been locked at least once
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_room_is_exclusive() {
        let locks = RoomLocks::new();
        let room_id = RoomId::from("!a:example.org");

        let guard = locks.lock(&room_id).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.lock(&room_id)).await;
        assert!(second.is_err());

        assert_eq!(locks.len(), 1);

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(20), locks.lock(&room_id)).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_rooms_are_independent() {
        let locks = RoomLocks::new();
        let _a = locks.lock(&RoomId::from("!a:example.org")).await;
        let b = tokio::time::timeout(
            Duration::from_millis(20),
            locks.lock(&RoomId::from("!b:example.org")),
        )
        .await;
        assert!(b.is_ok());
    }
}
