pub mod discord;
pub mod event;
pub mod id;
pub mod power_levels;

pub use discord::{
    DiscordMember, DiscordRole, MemberContent, RoleMap, DISCORD_GHOST_PREFIX, DISCORD_MEMBER_KEY,
};
pub use event::{
    MembershipEvent, MessageEvent, PowerLevelsEvent, RawEvent, RoomEvent, MEMBER_EVENT,
    MESSAGE_EVENT, POWER_LEVELS_EVENT,
};
pub use id::{EventId, RoomId, UserId};
pub use power_levels::PowerLevels;
