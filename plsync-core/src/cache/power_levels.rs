//! Power level state cache
//!
//! Holds the latest authoritative `m.room.power_levels` content per room so that
//! membership events don't refetch room state every time. Entries come only from
//! homeserver fetches, power level events or writes the homeserver accepted;
//! callers get clones and local edits never flow back in on their own.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    client::ChatClient,
    models::{PowerLevels, RoomId, POWER_LEVELS_EVENT},
    Result,
};

pub struct PowerLevelCache {
    client: Arc<dyn ChatClient>,
    tracked_rooms: HashSet<RoomId>,
    entries: DashMap<RoomId, PowerLevels>,
}

impl PowerLevelCache {
    /// Create an empty cache. Authoritative updates are accepted only for `tracked_rooms`.
    pub fn new(client: Arc<dyn ChatClient>, tracked_rooms: HashSet<RoomId>) -> Self {
        Self {
            client,
            tracked_rooms,
            entries: DashMap::new(),
        }
    }

    /// Get the power levels for a room, fetching and caching them on a miss.
    ///
    /// Fetch failures are returned as-is and leave the cache untouched.
    pub async fn get(&self, room_id: &RoomId) -> Result<PowerLevels> {
        if let Some(levels) = self.entries.get(room_id) {
            tracing::debug!(room_id = %room_id, "Power level cache hit");
            return Ok(levels.value().clone());
        }

        tracing::debug!(room_id = %room_id, "Power level cache miss");
        let content = self
            .client
            .get_state_event(room_id, POWER_LEVELS_EVENT, "")
            .await?;
        let levels = PowerLevels::from_value(content)?;
        self.entries.insert(room_id.clone(), levels.clone());
        Ok(levels)
    }

    /// Replace the cached entry with authoritative state. Returns whether the room is tracked.
    pub fn on_authoritative_update(&self, room_id: &RoomId, levels: PowerLevels) -> bool {
        if !self.tracked_rooms.contains(room_id) {
            return false;
        }
        self.entries.insert(room_id.clone(), levels);
        tracing::debug!(room_id = %room_id, "Power level cache updated");
        true
    }

    /// Store levels the homeserver accepted in a state write.
    ///
    /// The echo of the write arrives in a later `/sync` batch; until then this
    /// keeps follow-up writes for the same room from starting from stale state.
    pub fn confirm_write(&self, room_id: &RoomId, levels: PowerLevels) {
        if self.tracked_rooms.contains(room_id) {
            self.entries.insert(room_id.clone(), levels);
            tracing::debug!(room_id = %room_id, "Power level cache updated from accepted write");
        }
    }

    /// Drop the entry so the next `get` refetches
    pub fn invalidate(&self, room_id: &RoomId) {
        if self.entries.remove(room_id).is_some() {
            tracing::debug!(room_id = %room_id, "Power level cache invalidated");
        }
    }

    #[must_use]
    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.entries.contains_key(room_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry (shutdown or manual flush)
    pub fn clear(&self) {
        self.entries.clear();
        tracing::debug!("Power level cache cleared");
    }
}

impl std::fmt::Debug for PowerLevelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerLevelCache")
            .field("tracked_rooms", &self.tracked_rooms.len())
            .field("entries", &self.entries.len())
            .finish()
    }
}
