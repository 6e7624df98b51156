//! Store contracts consumed by the relay core.
//!
//! Both stores are expected to be internally consistent; callers never lock
//! around them.

use crate::error::StoreError;
use crate::settings::{GuildSettings, SettingsPatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An accepted correction, as written to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRecord {
    pub id: i64,
    pub original_message: String,
    pub corrected_message: String,
    pub user_id: String,
    pub channel_id: String,
    pub guild_id: String,
    pub message_id: String,
    /// Unix milliseconds, assigned by the store on insert
    pub timestamp: i64,
}

/// Caller-supplied part of a [`CorrectionRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCorrection {
    pub original_message: String,
    pub corrected_message: String,
    pub user_id: String,
    pub channel_id: String,
    pub guild_id: String,
    pub message_id: String,
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Stored settings for the guild, or the default record when none exist.
    async fn get_settings(&self, guild_id: &str) -> Result<GuildSettings, StoreError>;

    /// Merge `patch` into the guild's settings, creating the record if needed.
    async fn upsert_settings(&self, guild_id: &str, patch: SettingsPatch)
        -> Result<(), StoreError>;
}

#[async_trait]
pub trait CorrectionStore: Send + Sync {
    /// Append a record and return its id. The timestamp is assigned here.
    async fn append(&self, record: NewCorrection) -> Result<i64, StoreError>;

    /// Newest-first, at most `limit` records.
    async fn query_by_guild(
        &self,
        guild_id: &str,
        limit: usize,
    ) -> Result<Vec<CorrectionRecord>, StoreError>;

    /// Newest-first, at most `limit` records.
    async fn query_by_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CorrectionRecord>, StoreError>;

    /// Newest-first, at most `limit` records for one user within one guild.
    async fn query_by_user_in_guild(
        &self,
        guild_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CorrectionRecord>, StoreError>;

    /// Every record for the guild, newest first.
    async fn list_guild(&self, guild_id: &str) -> Result<Vec<CorrectionRecord>, StoreError>;

    async fn exists_for_message(&self, message_id: &str) -> Result<bool, StoreError>;
}
