use crate::persona::BUTLER_PERSONA;
use crate::stats::StatsBounds;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub llm_max_tokens: u32,
    pub llm_temperature: f32,
    pub llm_timeout_secs: u64,
    pub persona_prompt: String,
    pub database_url: String,
    /// Address for the HTTP webhook/interaction listener; disabled when unset
    pub http_listen_addr: Option<String>,
    pub status_message: String,
    pub dev_guild_id: Option<u64>,
    pub status_top_users: usize,
    pub status_recent_corrections: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            llm_url: env::var("LLM_URL").unwrap_or_else(|_| "http://localhost:8080/v1".to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4.1-nano".to_string()),
            llm_api_key: env::var("LLM_API_KEY").ok(),
            llm_max_tokens: parse_or("LLM_MAX_TOKENS", 200),
            llm_temperature: parse_or("LLM_TEMPERATURE", 0.7),
            llm_timeout_secs: parse_or("LLM_TIMEOUT_SECS", 30),
            persona_prompt: env::var("PERSONA_PROMPT")
                .unwrap_or_else(|_| BUTLER_PERSONA.to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "data/grammar-butler.db".to_string()),
            http_listen_addr: env::var("HTTP_LISTEN_ADDR")
                .ok()
                .filter(|addr| !addr.trim().is_empty()),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "Minding your grammar".to_string()),
            dev_guild_id: env::var("DEV_GUILD_ID").ok().and_then(|id| id.parse().ok()),
            status_top_users: parse_or("STATUS_TOP_USERS", 3),
            status_recent_corrections: parse_or("STATUS_RECENT_CORRECTIONS", 10),
        })
    }

    pub fn stats_bounds(&self) -> StatsBounds {
        StatsBounds {
            top_users: self.status_top_users,
            recent: self.status_recent_corrections,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("llm_url", &self.llm_url)
            .field("llm_model", &self.llm_model)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("llm_max_tokens", &self.llm_max_tokens)
            .field("llm_temperature", &self.llm_temperature)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("persona_prompt_len", &self.persona_prompt.len())
            .field("database_url", &self.database_url)
            .field("http_listen_addr", &self.http_listen_addr)
            .field("status_message", &self.status_message)
            .field("dev_guild_id", &self.dev_guild_id)
            .field("status_top_users", &self.status_top_users)
            .field("status_recent_corrections", &self.status_recent_corrections)
            .finish()
    }
}

/// Discord message limit is 2000 characters
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;
