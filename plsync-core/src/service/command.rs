//! Chat command parsing

use clap::Parser;

use crate::models::RoomId;

pub const SYNC_COMMAND: &str = "syncdiscordroles";

/// Name shown in rendered usage lines
const BIN_NAME: &str = "plsync";

/// Commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = BIN_NAME, disable_help_subcommand = true)]
pub enum Command {
    /// Recompute every bridged member's power level in a room
    #[command(name = SYNC_COMMAND)]
    SyncDiscordRoles {
        /// Room to resync, e.g. `!abc:example.org`
        room_id: RoomId,
    },
}

impl Command {
    /// Parse a message body such as `!syncdiscordroles !abc:example.org`.
    ///
    /// Returns `None` when the message is not addressed to a known command, and
    /// `Some(Err(_))` when it is but the arguments don't parse.
    #[must_use]
    pub fn from_message(prefix: &str, body: &str) -> Option<Result<Self, clap::Error>> {
        let mut words = body
            .trim_start()
            .strip_prefix(prefix)?
            .split_whitespace()
            .peekable();

        if words.peek() != Some(&SYNC_COMMAND) {
            return None;
        }
        Some(Self::try_parse_from(std::iter::once(BIN_NAME).chain(words)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_parse_sync_command() {
        assert_eq!(
            Command::from_message("!", "!syncdiscordroles !abc:example.org").unwrap().unwrap(),
            Command::SyncDiscordRoles {
                room_id: RoomId::from("!abc:example.org")
            }
        );
    }

    #[test]
    fn test_missing_argument() {
        let err = Command::from_message("!", "  !syncdiscordroles  ").unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let rendered = err.render().to_string();
        assert!(rendered.contains("Usage:"));
        assert!(rendered.contains(SYNC_COMMAND));
    }

    #[test]
    fn test_extra_argument_rejected() {
        let err = Command::from_message("!", "!syncdiscordroles !a:b !c:d").unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_other_messages_ignored() {
        assert!(Command::from_message("!", "hello there").is_none());
        assert!(Command::from_message("!", "!syncdiscordrolesx !a:b").is_none());
        assert!(Command::from_message("!", "syncdiscordroles !a:b").is_none());
        assert!(Command::from_message("!", "!help").is_none());
        assert!(Command::from_message("!", "!").is_none());
    }

    #[test]
    fn test_custom_prefix() {
        assert!(matches!(
            Command::from_message("pl ", "pl syncdiscordroles !a:b"),
            Some(Ok(Command::SyncDiscordRoles { .. }))
        ));
        assert!(Command::from_message("pl ", "!syncdiscordroles !a:b").is_none());
    }
}
