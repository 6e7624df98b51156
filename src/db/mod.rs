use crate::config::Config;
use crate::error::StoreError;
use crate::settings::{GuildSettings, ReplyMode, SettingsPatch};
use crate::store::{CorrectionRecord, CorrectionStore, NewCorrection, SettingsStore};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

const SCHEMA: &str = include_str!("schema.sql");

const LATEST_TIMESTAMP: &str =
    "SELECT timestamp FROM corrections ORDER BY timestamp DESC LIMIT 1";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(config: &Config) -> Result<Self, StoreError> {
        Self::open(&config.database_url)
    }

    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn execute_init(&self) -> Result<(), StoreError> {
        info!("Database: Initializing schema...");
        self.lock()?.execute_batch(SCHEMA)?;
        debug!("Database: Schema initialized successfully");
        Ok(())
    }

    /// Run a synchronous database operation on the blocking pool.
    pub async fn run_blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || f(&db)).await?
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // --- Guild Settings ---

    pub fn get_guild_settings(&self, guild_id: &str) -> Result<GuildSettings, StoreError> {
        let conn = self.lock()?;
        Ok(read_settings(&conn, guild_id)?.unwrap_or_default())
    }

    pub fn upsert_guild_settings(
        &self,
        guild_id: &str,
        patch: SettingsPatch,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let mut settings = read_settings(&tx, guild_id)?.unwrap_or_default();
        settings.apply(patch);

        tx.execute(
            "INSERT INTO guild_settings
                (guild_id, enabled, ignored_channels, ignored_users, correction_threshold, reply_mode, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP)
             ON CONFLICT(guild_id) DO UPDATE SET
                enabled = ?2,
                ignored_channels = ?3,
                ignored_users = ?4,
                correction_threshold = ?5,
                reply_mode = ?6,
                updated_at = CURRENT_TIMESTAMP",
            params![
                guild_id,
                settings.enabled,
                serde_json::to_string(&settings.ignored_channels)?,
                serde_json::to_string(&settings.ignored_users)?,
                settings.correction_threshold,
                settings.reply_mode.as_str(),
            ],
        )?;
        tx.commit()?;

        debug!("Database: Updated settings for guild {}", guild_id);
        Ok(())
    }

    // --- Corrections ---

    pub fn insert_correction(&self, record: &NewCorrection) -> Result<i64, StoreError> {
        let conn = self.lock()?;

        // Timestamps stay strictly increasing even when two inserts land in
        // the same millisecond.
        let last: i64 = conn
            .query_row(LATEST_TIMESTAMP, [], |row| row.get(0))
            .optional()?
            .unwrap_or(0);
        let timestamp = Utc::now().timestamp_millis().max(last + 1);

        conn.execute(
            "INSERT INTO corrections
                (original_message, corrected_message, user_id, channel_id, guild_id, message_id, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.original_message,
                record.corrected_message,
                record.user_id,
                record.channel_id,
                record.guild_id,
                record.message_id,
                timestamp,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(
            "Database: Stored correction {} for message {} in guild {}",
            id, record.message_id, record.guild_id
        );
        Ok(id)
    }

    pub fn corrections_for_guild(
        &self,
        guild_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        self.select_corrections(&[("guild_id", guild_id)], limit)
    }

    pub fn corrections_for_user(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        self.select_corrections(&[("user_id", user_id)], limit)
    }

    pub fn corrections_for_user_in_guild(
        &self,
        guild_id: &str,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        self.select_corrections(&[("guild_id", guild_id), ("user_id", user_id)], limit)
    }

    pub fn has_correction_for_message(&self, message_id: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let exists = conn
            .prepare("SELECT 1 FROM corrections WHERE message_id = ?1")?
            .exists([message_id])?;
        Ok(exists)
    }

    fn select_corrections(
        &self,
        filters: &[(&'static str, &str)],
        limit: Option<usize>,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        let conn = self.lock()?;
        let clause = filters
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!(
            "SELECT id, original_message, corrected_message, user_id, channel_id, guild_id, message_id, timestamp
             FROM corrections WHERE {}
             ORDER BY timestamp DESC, id DESC
             LIMIT ?{}",
            clause,
            filters.len() + 1
        );

        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut values: Vec<Value> = filters
            .iter()
            .map(|(_, value)| Value::Text(value.to_string()))
            .collect();
        values.push(Value::Integer(limit));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), record_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

fn read_settings(conn: &Connection, guild_id: &str) -> Result<Option<GuildSettings>, StoreError> {
    let row = conn
        .query_row(
            "SELECT enabled, ignored_channels, ignored_users, correction_threshold, reply_mode
             FROM guild_settings WHERE guild_id = ?1",
            [guild_id],
            |row| {
                Ok((
                    row.get::<_, bool>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((enabled, channels, users, threshold, mode)) = row else {
        return Ok(None);
    };

    let reply_mode = mode.parse::<ReplyMode>().unwrap_or_else(|e| {
        warn!("Database: guild {} has {}, using default", guild_id, e);
        ReplyMode::default()
    });

    Ok(Some(GuildSettings {
        enabled,
        ignored_channels: serde_json::from_str::<BTreeSet<String>>(&channels)?,
        ignored_users: serde_json::from_str::<BTreeSet<String>>(&users)?,
        correction_threshold: threshold,
        reply_mode,
    }))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CorrectionRecord> {
    Ok(CorrectionRecord {
        id: row.get(0)?,
        original_message: row.get(1)?,
        corrected_message: row.get(2)?,
        user_id: row.get(3)?,
        channel_id: row.get(4)?,
        guild_id: row.get(5)?,
        message_id: row.get(6)?,
        timestamp: row.get(7)?,
    })
}

#[async_trait]
impl SettingsStore for Database {
    async fn get_settings(&self, guild_id: &str) -> Result<GuildSettings, StoreError> {
        let guild_id = guild_id.to_string();
        self.run_blocking(move |db| db.get_guild_settings(&guild_id))
            .await
    }

    async fn upsert_settings(
        &self,
        guild_id: &str,
        patch: SettingsPatch,
    ) -> Result<(), StoreError> {
        let guild_id = guild_id.to_string();
        self.run_blocking(move |db| db.upsert_guild_settings(&guild_id, patch))
            .await
    }
}

#[async_trait]
impl CorrectionStore for Database {
    async fn append(&self, record: NewCorrection) -> Result<i64, StoreError> {
        self.run_blocking(move |db| db.insert_correction(&record))
            .await
    }

    async fn query_by_guild(
        &self,
        guild_id: &str,
        limit: usize,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        let guild_id = guild_id.to_string();
        self.run_blocking(move |db| db.corrections_for_guild(&guild_id, Some(limit)))
            .await
    }

    async fn query_by_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        let user_id = user_id.to_string();
        self.run_blocking(move |db| db.corrections_for_user(&user_id, Some(limit)))
            .await
    }

    async fn query_by_user_in_guild(
        &self,
        guild_id: &str,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CorrectionRecord>, StoreError> {
        let guild_id = guild_id.to_string();
        let user_id = user_id.to_string();
        self.run_blocking(move |db| {
            db.corrections_for_user_in_guild(&guild_id, &user_id, Some(limit))
        })
        .await
    }

    async fn list_guild(&self, guild_id: &str) -> Result<Vec<CorrectionRecord>, StoreError> {
        let guild_id = guild_id.to_string();
        self.run_blocking(move |db| db.corrections_for_guild(&guild_id, None))
            .await
    }

    async fn exists_for_message(&self, message_id: &str) -> Result<bool, StoreError> {
        let message_id = message_id.to_string();
        self.run_blocking(move |db| db.has_correction_for_message(&message_id))
            .await
    }
}
