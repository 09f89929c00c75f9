//! `/sync` response shapes.

use std::collections::HashMap;

use serde::Deserialize;

use crate::models::{RawEvent, RoomEvent, RoomId};

#[derive(Debug, Clone, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: SyncRooms,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncRooms {
    #[serde(default)]
    pub join: HashMap<RoomId, RoomUpdate>,
    #[serde(default)]
    pub leave: HashMap<RoomId, RoomUpdate>,
}

/// Joined and left rooms share the fields this service reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomUpdate {
    #[serde(default)]
    pub state: EventList,
    #[serde(default)]
    pub timeline: EventList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

impl SyncResponse {
    /// Decode every relevant event in the batch, room by room, state before timeline.
    ///
    /// Undecodable events are logged and dropped so one bad event cannot stall the feed.
    #[must_use]
    pub fn into_room_events(self) -> Vec<RoomEvent> {
        let mut rooms: Vec<(RoomId, RoomUpdate)> = self
            .rooms
            .join
            .into_iter()
            .chain(self.rooms.leave)
            .collect();
        // HashMap order is random; keep dispatch reproducible
        rooms.sort_by(|a, b| a.0.cmp(&b.0));

        let mut events = Vec::new();
        for (room_id, update) in rooms {
            for raw in update.state.events.into_iter().chain(update.timeline.events) {
                let event_type = raw.event_type.clone();
                match raw.into_room_event(&room_id) {
                    Ok(Some(event)) => events.push(event),
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            room_id = %room_id,
                            event_type = %event_type,
                            error = %e,
                            "Dropping undecodable event"
                        );
                    }
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_sync_batch() {
        let response: SyncResponse = serde_json::from_value(json!({
            "next_batch": "s72595_4483_1934",
            "rooms": {
                "join": {
                    "!b:example.org": {
                        "timeline": {"events": [
                            {"type": "m.room.member", "state_key": "@_discord_1:example.org",
                             "event_id": "$m1", "content": {"membership": "join"}}
                        ]}
                    },
                    "!a:example.org": {
                        "state": {"events": [
                            {"type": "m.room.power_levels", "state_key": "", "event_id": "$p1",
                             "content": {"users": {}}}
                        ]},
                        "timeline": {"events": [
                            {"type": "m.room.power_levels", "state_key": "", "event_id": "$bad",
                             "content": {"users": {"@x:example.org": "lots"}}},
                            {"type": "m.reaction", "event_id": "$r1", "content": {}}
                        ]}
                    }
                },
                "leave": {
                    "!c:example.org": {
                        "timeline": {"events": [
                            {"type": "m.room.member", "state_key": "@bot:example.org",
                             "event_id": "$l1", "content": {"membership": "leave"}}
                        ]}
                    }
                }
            }
        }))
        .unwrap();

        assert_eq!(response.next_batch, "s72595_4483_1934");
        let events = response.into_room_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], RoomEvent::PowerLevels(e) if e.room_id.as_str() == "!a:example.org"));
        assert!(matches!(&events[1], RoomEvent::Membership(e) if e.room_id.as_str() == "!b:example.org"));
        assert!(matches!(&events[2], RoomEvent::Membership(e) if e.user_id.as_str() == "@bot:example.org"));
    }

    #[test]
    fn test_empty_sync() {
        let response: SyncResponse =
            serde_json::from_value(json!({"next_batch": "s1"})).unwrap();
        assert!(response.into_room_events().is_empty());
    }
}
