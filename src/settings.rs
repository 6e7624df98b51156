//! Per-guild relay configuration.
//!
//! A guild without a stored record behaves exactly like one holding
//! [`GuildSettings::default`]; the store synthesizes that record on read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CORRECTION_THRESHOLD: f64 = 0.7;

/// How a correction is delivered back to the author.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    /// Threaded reply referencing the original message
    #[default]
    Reply,
    /// Direct message to the author
    Dm,
    /// Plain message in the originating channel
    Channel,
}

impl ReplyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyMode::Reply => "reply",
            ReplyMode::Dm => "dm",
            ReplyMode::Channel => "channel",
        }
    }
}

impl fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reply" => Ok(ReplyMode::Reply),
            "dm" => Ok(ReplyMode::Dm),
            "channel" => Ok(ReplyMode::Channel),
            other => Err(format!("unknown reply mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildSettings {
    pub enabled: bool,
    pub ignored_channels: BTreeSet<String>,
    pub ignored_users: BTreeSet<String>,
    /// Reserved confidence gate. Stored and reported, never enforced.
    pub correction_threshold: f64,
    pub reply_mode: ReplyMode,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ignored_channels: BTreeSet::new(),
            ignored_users: BTreeSet::new(),
            correction_threshold: DEFAULT_CORRECTION_THRESHOLD,
            reply_mode: ReplyMode::Reply,
        }
    }
}

/// Partial update for [`GuildSettings`]. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub ignored_channels: Option<BTreeSet<String>>,
    pub ignored_users: Option<BTreeSet<String>>,
    pub correction_threshold: Option<f64>,
    pub reply_mode: Option<ReplyMode>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.ignored_channels.is_none()
            && self.ignored_users.is_none()
            && self.correction_threshold.is_none()
            && self.reply_mode.is_none()
    }
}

impl GuildSettings {
    /// Merge a patch over this record. Thresholds are clamped into `[0, 1]`
    /// and non-finite values are dropped.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(channels) = patch.ignored_channels {
            self.ignored_channels = channels;
        }
        if let Some(users) = patch.ignored_users {
            self.ignored_users = users;
        }
        if let Some(threshold) = patch.correction_threshold.filter(|t| t.is_finite()) {
            self.correction_threshold = threshold.clamp(0.0, 1.0);
        }
        if let Some(mode) = patch.reply_mode {
            self.reply_mode = mode;
        }
    }
}
