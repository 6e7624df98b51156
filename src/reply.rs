//! Outbound delivery of corrections back to Discord.

use crate::config::DISCORD_MESSAGE_LIMIT;
use crate::error::DispatchError;
use crate::event::MessageEvent;
use crate::settings::ReplyMode;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serenity::{ChannelId, CreateMessage, Http, MessageId, UserId};
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Post `content` to a channel, optionally as a reply to `reply_to`.
    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<(), DispatchError>;

    /// Post `content` to the user's direct-message channel.
    async fn send_direct(&self, user_id: &str, content: &str) -> Result<(), DispatchError>;
}

/// Deliver `content` for `event` according to the guild's reply mode.
pub async fn dispatch(
    sink: &dyn ReplySink,
    mode: ReplyMode,
    event: &MessageEvent,
    content: &str,
) -> Result<(), DispatchError> {
    let content = fit_message(content);
    match mode {
        ReplyMode::Reply => {
            let reply_to = Some(event.id.as_str()).filter(|id| !id.is_empty());
            sink.send_message(&event.channel_id, &content, reply_to).await
        }
        ReplyMode::Channel => sink.send_message(&event.channel_id, &content, None).await,
        ReplyMode::Dm => sink.send_direct(&event.author.id, &content).await,
    }
}

/// Truncate to Discord's message limit on a char boundary.
pub fn fit_message(content: &str) -> String {
    if content.chars().count() <= DISCORD_MESSAGE_LIMIT {
        return content.to_string();
    }
    let mut out: String = content.chars().take(DISCORD_MESSAGE_LIMIT - 3).collect();
    out.push_str("...");
    out
}

pub struct DiscordReplySink {
    http: Arc<Http>,
}

impl DiscordReplySink {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ReplySink for DiscordReplySink {
    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<(), DispatchError> {
        let channel = ChannelId::new(parse_snowflake(channel_id)?);
        let mut builder = CreateMessage::new().content(content);
        if let Some(message_id) = reply_to {
            let message = MessageId::new(parse_snowflake(message_id)?);
            builder = builder.reference_message((channel, message));
        }

        debug!("Sending correction to channel {}", channel);
        channel
            .send_message(&self.http, builder)
            .await
            .map_err(|e| DispatchError::Discord(e.to_string()))?;
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, content: &str) -> Result<(), DispatchError> {
        let user = UserId::new(parse_snowflake(user_id)?);
        let dm = user
            .create_dm_channel(&self.http)
            .await
            .map_err(|e| DispatchError::Discord(e.to_string()))?;

        debug!("Sending correction to user {} by DM", user);
        dm.id
            .send_message(&self.http, CreateMessage::new().content(content))
            .await
            .map_err(|e| DispatchError::Discord(e.to_string()))?;
        Ok(())
    }
}

fn parse_snowflake(raw: &str) -> Result<u64, DispatchError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| DispatchError::InvalidId(raw.to_string()))
}
