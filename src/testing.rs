//! In-crate doubles for the completion service, the stores and the reply sink.

use crate::error::{DispatchError, StoreError};
use crate::llm::Completer;
use crate::reply::ReplySink;
use crate::settings::{GuildSettings, SettingsPatch};
use crate::store::{CorrectionRecord, CorrectionStore, NewCorrection, SettingsStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct ScriptedCompleter {
    answer: Result<String, String>,
    last_system: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl ScriptedCompleter {
    pub fn answering(answer: &str) -> Self {
        Self::with(Ok(answer.to_string()))
    }

    pub fn failing(error: &str) -> Self {
        Self::with(Err(error.to_string()))
    }

    fn with(answer: Result<String, String>) -> Self {
        Self {
            answer,
            last_system: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn last_system(&self) -> Option<String> {
        self.last_system.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    async fn complete(&self, system: &str, _user: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_system.lock().unwrap() = Some(system.to_string());
        self.answer.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

/// Every operation fails as if the database lock were poisoned.
pub struct FailingStore;

#[async_trait]
impl SettingsStore for FailingStore {
    async fn get_settings(&self, _guild_id: &str) -> Result<GuildSettings, StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn upsert_settings(
        &self,
        _guild_id: &str,
        _patch: SettingsPatch,
    ) -> Result<(), StoreError> {
        Err(StoreError::Poisoned)
    }
}

#[async_trait]
impl CorrectionStore for FailingStore {
    async fn append(&self, _record: NewCorrection) -> Result<i64, StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn query_by_guild(
        &self,
        _guild_id: &str,
        _limit: usize,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn query_by_user(
        &self,
        _user_id: &str,
        _limit: usize,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn query_by_user_in_guild(
        &self,
        _guild_id: &str,
        _user_id: &str,
        _limit: usize,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn list_guild(&self, _guild_id: &str) -> Result<Vec<CorrectionRecord>, StoreError> {
        Err(StoreError::Poisoned)
    }

    async fn exists_for_message(&self, _message_id: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Channel {
        channel_id: String,
        content: String,
        reply_to: Option<String>,
    },
    Direct {
        user_id: String,
        content: String,
    },
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<Sent>>,
    reject_with: Option<String>,
}

impl RecordingSink {
    pub fn rejecting(error: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject_with: Some(error.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<(), DispatchError> {
        if let Some(error) = &self.reject_with {
            return Err(DispatchError::Discord(error.clone()));
        }
        self.sent.lock().unwrap().push(Sent::Channel {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
            reply_to: reply_to.map(str::to_string),
        });
        Ok(())
    }

    async fn send_direct(&self, user_id: &str, content: &str) -> Result<(), DispatchError> {
        if let Some(error) = &self.reject_with {
            return Err(DispatchError::Discord(error.clone()));
        }
        self.sent.lock().unwrap().push(Sent::Direct {
            user_id: user_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }
}
