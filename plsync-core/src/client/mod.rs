//! Homeserver access used by the sync engine.

pub mod matrix;
pub mod sync;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{EventId, MembershipEvent, RoomId, UserId};
use crate::Result;

pub use matrix::MatrixClient;
pub use sync::{EventList, RoomUpdate, SyncResponse, SyncRooms};

/// Chat network operations the sync engine depends on.
///
/// Reads fail with [`crate::Error::Fetch`], writes with [`crate::Error::Send`].
/// Implementations do not retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Current content of a state event
    async fn get_state_event(
        &self,
        room_id: &RoomId,
        event_type: &str,
        state_key: &str,
    ) -> Result<Value>;

    async fn send_state_event(
        &self,
        room_id: &RoomId,
        event_type: &str,
        state_key: &str,
        content: &Value,
    ) -> Result<()>;

    /// Fresh snapshot of the room's current membership events
    async fn get_members(&self, room_id: &RoomId) -> Result<Vec<MembershipEvent>>;

    /// Acknowledge an event as handled
    async fn mark_read(&self, room_id: &RoomId, event_id: &EventId) -> Result<()>;

    /// Post a plain-text notice to a room
    async fn send_notice(&self, room_id: &RoomId, body: &str) -> Result<()>;

    /// The user this service acts as
    fn self_identity(&self) -> &UserId;
}
