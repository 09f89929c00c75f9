//! Role sync engine
//!
//! Reacts to power level and membership events and to the manual resync
//! command. Stateless apart from the power level cache it owns.

use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    cache::{PowerLevelCache, RoomLocks},
    client::ChatClient,
    config::SyncSettings,
    models::{
        MembershipEvent, MessageEvent, PowerLevels, PowerLevelsEvent, RoomId, UserId,
        POWER_LEVELS_EVENT,
    },
    service::{command::Command, resolver},
    Result,
};

pub const RESYNC_DISABLED_MESSAGE: &str = "Manual Discord role resync is disabled.";
pub const UNTRACKED_ROOM_MESSAGE: &str = "That room is not in my config.";

/// Result of handling a single state event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Not a tracked room, not a bridged user, or no mapped role
    Ignored,
    CacheUpdated,
    CacheInvalidated,
    /// The member already has the desired level; the event was acknowledged
    AlreadySynced { user_id: UserId, level: i64 },
    Updated { user_id: UserId, level: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncRejection {
    Disabled,
    UntrackedRoom,
    /// Missing or extra command arguments
    InvalidArguments,
}

/// Result of a manual resync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResyncOutcome {
    Rejected(ResyncRejection),
    /// Every bridged member already had the desired level
    Unchanged,
    /// One power level write covering `changed` members
    Updated { changed: usize },
}

pub struct SyncEngine {
    client: Arc<dyn ChatClient>,
    cache: PowerLevelCache,
    locks: RoomLocks,
    settings: SyncSettings,
}

impl SyncEngine {
    pub fn new(client: Arc<dyn ChatClient>, settings: SyncSettings) -> Self {
        let tracked: HashSet<RoomId> = settings.rooms.keys().cloned().collect();
        Self {
            cache: PowerLevelCache::new(Arc::clone(&client), tracked),
            client,
            locks: RoomLocks::new(),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    #[must_use]
    pub fn cache(&self) -> &PowerLevelCache {
        &self.cache
    }

    #[must_use]
    pub fn locks(&self) -> &RoomLocks {
        &self.locks
    }

    /// The identity this engine acts as
    #[must_use]
    pub fn self_identity(&self) -> &UserId {
        self.client.self_identity()
    }

    /// Authoritative power levels for a room were observed
    pub async fn on_power_levels(&self, event: &PowerLevelsEvent) -> SyncOutcome {
        if !self.settings.is_tracked(&event.room_id) {
            return SyncOutcome::Ignored;
        }

        let _guard = self.locks.lock(&event.room_id).await;
        self.cache
            .on_authoritative_update(&event.room_id, event.content.clone());
        SyncOutcome::CacheUpdated
    }

    /// A member's state changed in a room
    pub async fn on_membership(&self, event: &MembershipEvent) -> Result<SyncOutcome> {
        let room_id = &event.room_id;
        let user_id = &event.user_id;

        // Our own join/leave may have changed what we can see or do
        if user_id == self.client.self_identity() {
            if !self.settings.is_tracked(room_id) {
                return Ok(SyncOutcome::Ignored);
            }
            let _guard = self.locks.lock(room_id).await;
            self.cache.invalidate(room_id);
            return Ok(SyncOutcome::CacheInvalidated);
        }

        if !user_id.is_discord_ghost(&self.settings.server_name) {
            return Ok(SyncOutcome::Ignored);
        }

        let Some(desired) = resolver::resolve(room_id, &event.content, &self.settings.rooms)
        else {
            tracing::debug!(room_id = %room_id, user_id = %user_id, "No mapped role for member");
            return Ok(SyncOutcome::Ignored);
        };

        tracing::info!(room_id = %room_id, user_id = %user_id, level = desired, "Set power level");

        let _guard = self.locks.lock(room_id).await;
        let mut levels = self.cache.get(room_id).await?;

        if levels.user_level(user_id) == desired {
            tracing::info!(room_id = %room_id, user_id = %user_id, level = desired, "Power level already set");
            if let Some(event_id) = &event.event_id {
                self.client.mark_read(room_id, event_id).await?;
            }
            return Ok(SyncOutcome::AlreadySynced {
                user_id: user_id.clone(),
                level: desired,
            });
        }

        levels.set_user_level(user_id, desired);
        self.write_power_levels(room_id, levels).await?;

        Ok(SyncOutcome::Updated {
            user_id: user_id.clone(),
            level: desired,
        })
    }

    /// Run a parsed chat command
    pub async fn handle_command(
        &self,
        event: &MessageEvent,
        command: &Command,
    ) -> Result<ResyncOutcome> {
        match command {
            Command::SyncDiscordRoles { room_id } => self.resync(event, room_id).await,
        }
    }

    /// Reply to a command that failed to parse with clap's rendered error and usage
    pub async fn reject_command(
        &self,
        event: &MessageEvent,
        error: &clap::Error,
    ) -> Result<ResyncOutcome> {
        let reply = error.render().to_string();
        self.client
            .send_notice(&event.room_id, reply.trim_end())
            .await?;
        Ok(ResyncOutcome::Rejected(ResyncRejection::InvalidArguments))
    }

    /// Recompute every bridged member's level in `room_id` and write all changes at once.
    ///
    /// Power levels are read through the cache, the member list is always fetched
    /// fresh. At most one state write is issued. The command event is acknowledged
    /// once the room has been processed.
    pub async fn resync(&self, command: &MessageEvent, room_id: &RoomId) -> Result<ResyncOutcome> {
        if !self.settings.allow_manual_resync {
            self.client
                .send_notice(&command.room_id, RESYNC_DISABLED_MESSAGE)
                .await?;
            return Ok(ResyncOutcome::Rejected(ResyncRejection::Disabled));
        }

        if !self.settings.is_tracked(room_id) {
            self.client
                .send_notice(&command.room_id, UNTRACKED_ROOM_MESSAGE)
                .await?;
            return Ok(ResyncOutcome::Rejected(ResyncRejection::UntrackedRoom));
        }

        tracing::info!(room_id = %room_id, requested_by = %command.sender, "Manual role resync");

        let outcome = {
            let _guard = self.locks.lock(room_id).await;
            let mut levels = self.cache.get(room_id).await?;
            let members = self.client.get_members(room_id).await?;

            let mut changed = 0;
            for member in &members {
                if !member.user_id.is_discord_ghost(&self.settings.server_name) {
                    continue;
                }
                let Some(desired) =
                    resolver::resolve(room_id, &member.content, &self.settings.rooms)
                else {
                    continue;
                };
                if levels.user_level(&member.user_id) != desired {
                    levels.set_user_level(&member.user_id, desired);
                    changed += 1;
                }
            }

            if changed > 0 {
                self.write_power_levels(room_id, levels).await?;
                ResyncOutcome::Updated { changed }
            } else {
                ResyncOutcome::Unchanged
            }
        };

        tracing::info!(room_id = %room_id, outcome = ?outcome, "Manual role resync finished");

        if let Some(event_id) = &command.event_id {
            self.client.mark_read(&command.room_id, event_id).await?;
        }

        Ok(outcome)
    }

    /// Send the full power level state and, once accepted, make it the cached state.
    ///
    /// Callers hold the room lock. A failed send leaves the cache as it was.
    async fn write_power_levels(&self, room_id: &RoomId, levels: PowerLevels) -> Result<()> {
        let content = levels.to_value()?;
        self.client
            .send_state_event(room_id, POWER_LEVELS_EVENT, "", &content)
            .await?;
        self.cache.confirm_write(room_id, levels);
        Ok(())
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("self_identity", self.client.self_identity())
            .field("tracked_rooms", &self.settings.rooms.len())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
