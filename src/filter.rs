//! Eligibility gate in front of the correction engine.

use crate::event::MessageEvent;
use crate::settings::GuildSettings;
use std::fmt;

/// Leading characters that mark a message as a command rather than prose.
pub const COMMAND_PREFIXES: [char; 2] = ['/', '!'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BotAuthor,
    CommandPrefix,
    GuildDisabled,
    IgnoredChannel,
    IgnoredUser,
    /// Direct messages carry no guild and therefore no settings.
    NoGuild,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::BotAuthor => "author is a bot",
            SkipReason::CommandPrefix => "message looks like a command",
            SkipReason::GuildDisabled => "relay disabled for guild",
            SkipReason::IgnoredChannel => "channel is ignored",
            SkipReason::IgnoredUser => "user is ignored",
            SkipReason::NoGuild => "message is outside a guild",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Process,
    Skip(SkipReason),
}

/// Rules that need nothing but the event itself.
pub fn screen(event: &MessageEvent) -> Option<SkipReason> {
    if event.author.bot {
        return Some(SkipReason::BotAuthor);
    }
    if event.content.starts_with(COMMAND_PREFIXES) {
        return Some(SkipReason::CommandPrefix);
    }
    None
}

/// Decide whether `event` goes to the correction engine. First matching rule wins.
pub fn decide(event: &MessageEvent, settings: &GuildSettings) -> Decision {
    if let Some(reason) = screen(event) {
        return Decision::Skip(reason);
    }
    if !settings.enabled {
        return Decision::Skip(SkipReason::GuildDisabled);
    }
    if settings.ignored_channels.contains(&event.channel_id) {
        return Decision::Skip(SkipReason::IgnoredChannel);
    }
    if settings.ignored_users.contains(&event.author.id) {
        return Decision::Skip(SkipReason::IgnoredUser);
    }
    Decision::Process
}
