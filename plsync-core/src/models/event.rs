//! Room events consumed from the homeserver feed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{EventId, MemberContent, PowerLevels, RoomId, UserId};
use crate::Result;

pub const POWER_LEVELS_EVENT: &str = "m.room.power_levels";
pub const MEMBER_EVENT: &str = "m.room.member";
pub const MESSAGE_EVENT: &str = "m.room.message";

/// Client-server API event as delivered by `/sync` and `/members`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    #[serde(default)]
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerLevelsEvent {
    pub room_id: RoomId,
    pub event_id: Option<EventId>,
    pub content: PowerLevels,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipEvent {
    pub room_id: RoomId,
    pub event_id: Option<EventId>,
    /// The member whose state changed (the event's state key)
    pub user_id: UserId,
    pub content: MemberContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub room_id: RoomId,
    pub event_id: Option<EventId>,
    pub sender: UserId,
    pub body: String,
}

/// Decoded event relevant to role sync
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    PowerLevels(PowerLevelsEvent),
    Membership(MembershipEvent),
    Message(MessageEvent),
}

impl RawEvent {
    /// Decode into a typed event. `room_id` is used when the event itself omits it,
    /// as `/sync` does for events nested under their room.
    ///
    /// Returns `Ok(None)` for event types this service does not consume and for
    /// events missing the fields needed to act on them.
    pub fn into_room_event(self, room_id: &RoomId) -> Result<Option<RoomEvent>> {
        let room_id = self.room_id.unwrap_or_else(|| room_id.clone());

        let event = match self.event_type.as_str() {
            POWER_LEVELS_EVENT if self.state_key.as_deref() == Some("") => {
                RoomEvent::PowerLevels(PowerLevelsEvent {
                    room_id,
                    event_id: self.event_id,
                    content: PowerLevels::from_value(self.content)?,
                })
            }
            MEMBER_EVENT => {
                let Some(state_key) = self.state_key else {
                    return Ok(None);
                };
                RoomEvent::Membership(MembershipEvent {
                    room_id,
                    event_id: self.event_id,
                    user_id: UserId(state_key),
                    content: MemberContent::from_value(&self.content),
                })
            }
            MESSAGE_EVENT => {
                let (Some(sender), Some(body)) = (
                    self.sender,
                    self.content.get("body").and_then(Value::as_str),
                ) else {
                    return Ok(None);
                };
                RoomEvent::Message(MessageEvent {
                    room_id,
                    event_id: self.event_id,
                    sender,
                    body: body.to_string(),
                })
            }
            _ => return Ok(None),
        };

        Ok(Some(event))
    }
}
