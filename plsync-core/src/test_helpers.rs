//! Test helpers and fixtures for plsync-core tests
//!
//! Provides an in-memory [`ChatClient`] that records every write, plus
//! builders for bridged member events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::client::ChatClient;
use crate::config::SyncSettings;
use crate::models::{
    DiscordMember, DiscordRole, EventId, MemberContent, MembershipEvent, MessageEvent, RoleMap,
    RoomId, UserId,
};
use crate::{Error, Result};

pub const SERVER_NAME: &str = "example.org";
pub const BOT_USER: &str = "@plsync:example.org";
pub const TRACKED_ROOM: &str = "!tracked:example.org";
pub const UNTRACKED_ROOM: &str = "!elsewhere:example.org";
pub const CONTROL_ROOM: &str = "!control:example.org";

pub fn test_room_id(id: &str) -> RoomId {
    RoomId::from(id)
}

pub fn test_user_id(id: &str) -> UserId {
    UserId::from(id)
}

pub fn ghost(discord_id: &str) -> UserId {
    UserId(format!("@_discord_{discord_id}:{SERVER_NAME}"))
}

pub fn role(name: &str, position: i64) -> DiscordRole {
    DiscordRole {
        name: name.to_string(),
        position,
        color: None,
    }
}

/// `{"Admin": 100, "Member": 10}`
pub fn default_role_map() -> RoleMap {
    RoleMap::from([("Admin".to_string(), 100), ("Member".to_string(), 10)])
}

/// Settings tracking [`TRACKED_ROOM`] with [`default_role_map`]
pub fn test_settings(allow_manual_resync: bool) -> SyncSettings {
    SyncSettings {
        rooms: HashMap::from([(test_room_id(TRACKED_ROOM), default_role_map())]),
        server_name: SERVER_NAME.to_string(),
        allow_manual_resync,
        command_prefix: "!".to_string(),
    }
}

/// Joined member event carrying bridged Discord roles
pub fn bridged_member(room_id: &str, user_id: &UserId, roles: Vec<DiscordRole>) -> MembershipEvent {
    MembershipEvent {
        room_id: test_room_id(room_id),
        event_id: Some(EventId(format!("$member-{}", user_id.as_str()))),
        user_id: user_id.clone(),
        content: MemberContent {
            membership: Some("join".to_string()),
            displayname: None,
            discord: Some(DiscordMember {
                roles,
                ..DiscordMember::default()
            }),
        },
    }
}

/// Member event without any bridge payload (profile change, leave, plain user)
pub fn plain_member(room_id: &str, user_id: &UserId) -> MembershipEvent {
    MembershipEvent {
        room_id: test_room_id(room_id),
        event_id: Some(EventId(format!("$member-{}", user_id.as_str()))),
        user_id: user_id.clone(),
        content: MemberContent {
            membership: Some("join".to_string()),
            ..MemberContent::default()
        },
    }
}

pub fn command_event(room_id: &str, body: &str) -> MessageEvent {
    MessageEvent {
        room_id: test_room_id(room_id),
        event_id: Some(EventId::from("$command")),
        sender: test_user_id("@mod:example.org"),
        body: body.to_string(),
    }
}

/// In-memory homeserver double
pub struct FakeClient {
    identity: UserId,
    power_levels: Mutex<HashMap<RoomId, Value>>,
    members: Mutex<HashMap<RoomId, Vec<MembershipEvent>>>,
    sent_states: Mutex<Vec<(RoomId, Value)>>,
    notices: Mutex<Vec<(RoomId, String)>>,
    receipts: Mutex<Vec<(RoomId, EventId)>>,
    state_fetches: AtomicUsize,
    member_fetches: AtomicUsize,
    fail_fetches: AtomicBool,
    fail_sends: AtomicBool,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            identity: test_user_id(BOT_USER),
            power_levels: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            sent_states: Mutex::new(Vec::new()),
            notices: Mutex::new(Vec::new()),
            receipts: Mutex::new(Vec::new()),
            state_fetches: AtomicUsize::new(0),
            member_fetches: AtomicUsize::new(0),
            fail_fetches: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
        }
    }

    pub fn set_power_levels(&self, room_id: &str, content: Value) {
        self.power_levels.lock().insert(test_room_id(room_id), content);
    }

    /// The room's power levels as the homeserver currently holds them
    pub fn current_power_levels(&self, room_id: &str) -> Value {
        self.power_levels
            .lock()
            .get(&test_room_id(room_id))
            .cloned()
            .unwrap_or_else(|| json!({}))
    }

    pub fn set_members(&self, room_id: &str, members: Vec<MembershipEvent>) {
        self.members.lock().insert(test_room_id(room_id), members);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent_states(&self) -> Vec<(RoomId, Value)> {
        self.sent_states.lock().clone()
    }

    pub fn notices(&self) -> Vec<(RoomId, String)> {
        self.notices.lock().clone()
    }

    pub fn receipts(&self) -> Vec<(RoomId, EventId)> {
        self.receipts.lock().clone()
    }

    pub fn state_fetches(&self) -> usize {
        self.state_fetches.load(Ordering::SeqCst)
    }

    pub fn member_fetches(&self) -> usize {
        self.member_fetches.load(Ordering::SeqCst)
    }

    fn check_fetch(&self) -> Result<()> {
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(Error::Fetch("homeserver unavailable".to_string()));
        }
        Ok(())
    }

    fn check_send(&self) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Send("homeserver unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatClient for FakeClient {
    async fn get_state_event(
        &self,
        room_id: &RoomId,
        _event_type: &str,
        _state_key: &str,
    ) -> Result<Value> {
        self.state_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_fetch()?;
        Ok(self
            .power_levels
            .lock()
            .get(room_id)
            .cloned()
            .unwrap_or_else(|| json!({})))
    }

    async fn send_state_event(
        &self,
        room_id: &RoomId,
        _event_type: &str,
        _state_key: &str,
        content: &Value,
    ) -> Result<()> {
        self.check_send()?;
        self.sent_states
            .lock()
            .push((room_id.clone(), content.clone()));
        // Like a homeserver, the write becomes the new current state
        self.power_levels
            .lock()
            .insert(room_id.clone(), content.clone());
        Ok(())
    }

    async fn get_members(&self, room_id: &RoomId) -> Result<Vec<MembershipEvent>> {
        self.member_fetches.fetch_add(1, Ordering::SeqCst);
        // Give concurrent triggers a chance to run mid-operation
        tokio::task::yield_now().await;
        self.check_fetch()?;
        Ok(self.members.lock().get(room_id).cloned().unwrap_or_default())
    }

    async fn mark_read(&self, room_id: &RoomId, event_id: &EventId) -> Result<()> {
        self.check_send()?;
        self.receipts.lock().push((room_id.clone(), event_id.clone()));
        Ok(())
    }

    async fn send_notice(&self, room_id: &RoomId, body: &str) -> Result<()> {
        self.check_send()?;
        self.notices.lock().push((room_id.clone(), body.to_string()));
        Ok(())
    }

    fn self_identity(&self) -> &UserId {
        &self.identity
    }
}
