//! Inbound message events, independent of the transport that delivered them.

use poise::serenity_prelude as serenity;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub bot: bool,
}

/// A chat message as seen by the relay. Absent or `null` fields decode to
/// their empty defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
    #[serde(default, deserialize_with = "nullable")]
    pub author: Author,
    #[serde(default, deserialize_with = "nullable")]
    pub channel_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub guild_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
}

/// Identifiers that travel with a correction into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIdentity {
    pub user_id: String,
    pub channel_id: String,
    pub guild_id: String,
    pub message_id: String,
}

impl MessageEvent {
    pub fn identity(&self) -> MessageIdentity {
        MessageIdentity {
            user_id: self.author.id.clone(),
            channel_id: self.channel_id.clone(),
            guild_id: self.guild_id.clone(),
            message_id: self.id.clone(),
        }
    }
}

impl From<&serenity::Message> for MessageEvent {
    fn from(message: &serenity::Message) -> Self {
        Self {
            content: message.content.clone(),
            author: Author {
                id: message.author.id.to_string(),
                bot: message.author.bot,
            },
            channel_id: message.channel_id.to_string(),
            guild_id: message
                .guild_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            id: message.id.to_string(),
        }
    }
}

/// Gateway-style dispatch wrapper, `{"t": "MESSAGE_CREATE", "d": {...}}`.
#[derive(Debug, Deserialize)]
pub struct GatewayEnvelope {
    pub t: Option<String>,
    pub d: Option<serde_json::Value>,
}

pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";

/// Decode a webhook body into a message event.
///
/// Accepts either a gateway envelope or a bare event. Returns `None` for
/// malformed payloads and for envelopes carrying other dispatch types.
pub fn parse_webhook_body(body: &[u8]) -> Option<MessageEvent> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    if value.get("t").is_some() {
        let envelope: GatewayEnvelope = serde_json::from_value(value).ok()?;
        if envelope.t.as_deref() != Some(MESSAGE_CREATE) {
            return None;
        }
        return serde_json::from_value(envelope.d?).ok();
    }
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
