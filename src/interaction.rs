//! Discord interaction webhook responder.
//!
//! Maps the handful of interaction types the relay understands onto
//! Discord's response envelope. Read-only: it never writes to a store.

use crate::error::StoreError;
use crate::stats::{self, CorrectionStats, StatsBounds};
use crate::store::CorrectionStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const PING: u8 = 1;
pub const APPLICATION_COMMAND: u8 = 2;

pub const PONG: u8 = 1;
pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

/// Response visible only to the invoking user.
pub const EPHEMERAL: u64 = 64;

pub const STATUS_COMMAND: &str = "butler-status";

const GUILD_ONLY_MESSAGE: &str = "This command can only be used in a server!";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<CommandData>,
    #[serde(default)]
    pub guild_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandData {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: PONG,
            data: None,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(ResponseData {
                content: content.into(),
                flags: Some(EPHEMERAL),
            }),
        }
    }
}

pub struct InteractionResponder {
    store: Arc<dyn CorrectionStore>,
    bounds: StatsBounds,
}

impl InteractionResponder {
    pub fn new(store: Arc<dyn CorrectionStore>, bounds: StatsBounds) -> Self {
        Self { store, bounds }
    }

    pub async fn respond(&self, interaction: &Interaction) -> Result<InteractionResponse, StoreError> {
        if interaction.kind != APPLICATION_COMMAND {
            return Ok(InteractionResponse::pong());
        }

        let name = interaction
            .data
            .as_ref()
            .and_then(|data| data.name.as_deref());
        if name != Some(STATUS_COMMAND) {
            debug!("Interaction: unrecognised command {:?}", name);
            return Ok(InteractionResponse::pong());
        }

        let Some(guild_id) = interaction.guild_id.as_deref().filter(|g| !g.is_empty()) else {
            return Ok(InteractionResponse::ephemeral(GUILD_ONLY_MESSAGE));
        };

        let stats = stats::guild_stats(self.store.as_ref(), guild_id, self.bounds).await?;
        Ok(InteractionResponse::ephemeral(format_status_report(
            &stats,
            self.bounds.top_users,
        )))
    }
}

pub fn format_status_report(stats: &CorrectionStats, top_users: usize) -> String {
    let leaders = stats
        .top_users(top_users)
        .into_iter()
        .map(|(user, count)| format!("<@{}> ({})", user, count))
        .collect::<Vec<_>>()
        .join(", ");
    let leaders = if leaders.is_empty() {
        "None yet".to_string()
    } else {
        leaders
    };

    format!(
        "🎩 **The Butler's Status Report**\n\n\
         📊 Total corrections made: **{}**\n\
         🏆 Most corrected users: {}\n\n\
         *At your service, as always! 🎩*",
        stats.total_corrections, leaders
    )
}
