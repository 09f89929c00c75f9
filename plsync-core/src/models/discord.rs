//! Discord member data mirrored by the bridge into `m.room.member` content.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Content key under which the bridge stores the Discord member payload
pub const DISCORD_MEMBER_KEY: &str = "uk.half-shot.discord.member";

/// Localpart prefix of users puppeted by the Discord bridge
pub const DISCORD_GHOST_PREFIX: &str = "@_discord_";

/// Per-room mapping of Discord role name to power level
pub type RoleMap = HashMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordRole {
    pub name: String,
    /// Higher position means higher priority
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordMember {
    #[serde(default)]
    pub roles: Vec<DiscordRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default)]
    pub bot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_color: Option<i64>,
}

/// Typed view of `m.room.member` content.
///
/// `discord` is `None` whenever the event carries no usable role data: profile-only
/// updates, non-join memberships, or a payload the bridge did not write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberContent {
    pub membership: Option<String>,
    pub displayname: Option<String>,
    pub discord: Option<DiscordMember>,
}

impl MemberContent {
    #[must_use]
    pub fn from_value(content: &Value) -> Self {
        let text = |key: &str| content.get(key).and_then(Value::as_str).map(str::to_owned);

        let discord = content
            .get(DISCORD_MEMBER_KEY)
            .and_then(|raw| match DiscordMember::deserialize(raw) {
                Ok(member) => Some(member),
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring malformed Discord member payload");
                    None
                }
            });

        Self {
            membership: text("membership"),
            displayname: text("displayname"),
            discord,
        }
    }

    /// Role list of the bridged member, if the event carries one
    #[must_use]
    pub fn roles(&self) -> Option<&[DiscordRole]> {
        self.discord.as_ref().map(|member| member.roles.as_slice())
    }
}
