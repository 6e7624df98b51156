//! End-to-end handling of a single inbound message.
//!
//! Steps run strictly in order: screen, resolve settings, decide, guard
//! against duplicates, correct (which persists), then dispatch. A store
//! failure aborts the event; a delivery failure does not undo the record.

use crate::correction::{CorrectionEngine, CorrectionResult};
use crate::error::PipelineError;
use crate::event::MessageEvent;
use crate::filter::{self, Decision, SkipReason};
use crate::reply::{self, ReplySink};
use crate::store::{CorrectionStore, SettingsStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    /// A correction for this message id was already recorded.
    Duplicate,
    NoCorrection,
    Delivered,
    /// The reply could not be sent; carries the delivery error text.
    Undelivered(String),
}

pub struct Relay {
    settings: Arc<dyn SettingsStore>,
    corrections: Arc<dyn CorrectionStore>,
    engine: CorrectionEngine,
    replies: Arc<dyn ReplySink>,
}

impl Relay {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        corrections: Arc<dyn CorrectionStore>,
        engine: CorrectionEngine,
        replies: Arc<dyn ReplySink>,
    ) -> Self {
        Self {
            settings,
            corrections,
            engine,
            replies,
        }
    }

    pub async fn handle(&self, event: &MessageEvent) -> Result<Outcome, PipelineError> {
        // Bot and command traffic never costs a settings read.
        if let Some(reason) = filter::screen(event) {
            debug!("Skipping message {}: {}", event.id, reason);
            return Ok(Outcome::Skipped(reason));
        }
        if event.guild_id.is_empty() {
            debug!("Skipping message {}: {}", event.id, SkipReason::NoGuild);
            return Ok(Outcome::Skipped(SkipReason::NoGuild));
        }

        let settings = self.settings.get_settings(&event.guild_id).await?;
        if let Decision::Skip(reason) = filter::decide(event, &settings) {
            debug!("Skipping message {}: {}", event.id, reason);
            return Ok(Outcome::Skipped(reason));
        }

        if !event.id.is_empty() && self.corrections.exists_for_message(&event.id).await? {
            info!("Message {} already has a correction, ignoring redelivery", event.id);
            return Ok(Outcome::Duplicate);
        }

        let content = match self.engine.correct(&event.content, &event.identity()).await? {
            CorrectionResult::NoCorrection => return Ok(Outcome::NoCorrection),
            CorrectionResult::Correction(content) => content,
        };

        match reply::dispatch(self.replies.as_ref(), settings.reply_mode, event, &content).await {
            Ok(()) => {
                info!(
                    "Correction for message {} delivered via {}",
                    event.id, settings.reply_mode
                );
                Ok(Outcome::Delivered)
            }
            Err(e) => {
                warn!("Failed to deliver correction for message {}: {}", event.id, e);
                Ok(Outcome::Undelivered(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::event::Author;
    use crate::persona::{BUTLER_PERSONA, FALLBACK_APOLOGY};
    use crate::settings::{ReplyMode, SettingsPatch};
    use crate::testing::{FailingStore, RecordingSink, ScriptedCompleter, Sent};

    const CORRECTED: &str = "I beg your pardon, but might I suggest: 'I don't know.'";

    fn test_db() -> Database {
        let db = Database::open(":memory:").unwrap();
        db.execute_init().unwrap();
        db
    }

    fn event() -> MessageEvent {
        MessageEvent {
            content: "i dont no".to_string(),
            author: Author {
                id: "42".to_string(),
                bot: false,
            },
            channel_id: "c1".to_string(),
            guild_id: "g1".to_string(),
            id: "m1".to_string(),
        }
    }

    fn relay(
        db: &Database,
        completer: Arc<ScriptedCompleter>,
        sink: Arc<RecordingSink>,
    ) -> Relay {
        let engine = CorrectionEngine::new(completer, Arc::new(db.clone()), BUTLER_PERSONA);
        Relay::new(Arc::new(db.clone()), Arc::new(db.clone()), engine, sink)
    }

    #[tokio::test]
    async fn test_end_to_end_default_settings() {
        let db = test_db();
        let sink = Arc::new(RecordingSink::default());
        let relay = relay(&db, Arc::new(ScriptedCompleter::answering(CORRECTED)), sink.clone());

        let outcome = relay.handle(&event()).await.unwrap();
        assert_eq!(outcome, Outcome::Delivered);

        let records = db.corrections_for_guild("g1", None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message_id, "m1");
        assert_eq!(records[0].corrected_message, CORRECTED);

        assert_eq!(
            sink.sent(),
            vec![Sent::Channel {
                channel_id: "c1".to_string(),
                content: CORRECTED.to_string(),
                reply_to: Some("m1".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_bot_skipped_before_any_store_access() {
        let completer = Arc::new(ScriptedCompleter::answering(CORRECTED));
        let sink = Arc::new(RecordingSink::default());
        let engine = CorrectionEngine::new(completer.clone(), Arc::new(FailingStore), BUTLER_PERSONA);
        let relay = Relay::new(Arc::new(FailingStore), Arc::new(FailingStore), engine, sink.clone());

        let mut ev = event();
        ev.author.bot = true;
        assert_eq!(
            relay.handle(&ev).await.unwrap(),
            Outcome::Skipped(SkipReason::BotAuthor)
        );
        assert_eq!(completer.calls(), 0);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_direct_message_skipped_without_store_access() {
        let completer = Arc::new(ScriptedCompleter::answering(CORRECTED));
        let sink = Arc::new(RecordingSink::default());
        let engine = CorrectionEngine::new(completer.clone(), Arc::new(FailingStore), BUTLER_PERSONA);
        let relay = Relay::new(Arc::new(FailingStore), Arc::new(FailingStore), engine, sink.clone());

        let mut ev = event();
        ev.guild_id = String::new();
        assert_eq!(
            relay.handle(&ev).await.unwrap(),
            Outcome::Skipped(SkipReason::NoGuild)
        );
        assert_eq!(completer.calls(), 0);
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_ignored_channel_skipped() {
        let db = test_db();
        db.upsert_guild_settings(
            "g1",
            SettingsPatch {
                ignored_channels: Some(["c1".to_string()].into()),
                ..Default::default()
            },
        )
        .unwrap();
        let completer = Arc::new(ScriptedCompleter::answering(CORRECTED));
        let relay = relay(&db, completer.clone(), Arc::new(RecordingSink::default()));

        assert_eq!(
            relay.handle(&event()).await.unwrap(),
            Outcome::Skipped(SkipReason::IgnoredChannel)
        );
        assert_eq!(completer.calls(), 0);
    }

    #[tokio::test]
    async fn test_perfect_grammar_sends_nothing() {
        let db = test_db();
        let sink = Arc::new(RecordingSink::default());
        let relay = relay(
            &db,
            Arc::new(ScriptedCompleter::answering("PERFECT_GRAMMAR")),
            sink.clone(),
        );

        assert_eq!(relay.handle(&event()).await.unwrap(), Outcome::NoCorrection);
        assert!(sink.sent().is_empty());
        assert!(db.corrections_for_guild("g1", None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_redelivery_is_ignored() {
        let db = test_db();
        let completer = Arc::new(ScriptedCompleter::answering(CORRECTED));
        let sink = Arc::new(RecordingSink::default());
        let relay = relay(&db, completer.clone(), sink.clone());

        assert_eq!(relay.handle(&event()).await.unwrap(), Outcome::Delivered);
        assert_eq!(relay.handle(&event()).await.unwrap(), Outcome::Duplicate);

        assert_eq!(db.corrections_for_guild("g1", None).unwrap().len(), 1);
        assert_eq!(sink.sent().len(), 1);
        assert_eq!(completer.calls(), 1);
    }

    #[tokio::test]
    async fn test_service_failure_still_replies_without_record() {
        let db = test_db();
        let sink = Arc::new(RecordingSink::default());
        let relay = relay(&db, Arc::new(ScriptedCompleter::failing("502")), sink.clone());

        assert_eq!(relay.handle(&event()).await.unwrap(), Outcome::Delivered);
        assert!(db.corrections_for_guild("g1", None).unwrap().is_empty());
        assert!(matches!(
            &sink.sent()[0],
            Sent::Channel { content, .. } if content == FALLBACK_APOLOGY
        ));
    }

    #[tokio::test]
    async fn test_store_failure_aborts_before_reply() {
        let db = test_db();
        let sink = Arc::new(RecordingSink::default());
        let engine = CorrectionEngine::new(
            Arc::new(ScriptedCompleter::answering(CORRECTED)),
            Arc::new(FailingStore),
            BUTLER_PERSONA,
        );
        let relay = Relay::new(Arc::new(db.clone()), Arc::new(db), engine, sink.clone());

        let err = relay.handle(&event()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Correction(_)));
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_settings_failure_aborts() {
        let db = test_db();
        let engine = CorrectionEngine::new(
            Arc::new(ScriptedCompleter::answering(CORRECTED)),
            Arc::new(db.clone()),
            BUTLER_PERSONA,
        );
        let relay = Relay::new(
            Arc::new(FailingStore),
            Arc::new(db),
            engine,
            Arc::new(RecordingSink::default()),
        );

        assert!(matches!(
            relay.handle(&event()).await,
            Err(PipelineError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_record() {
        let db = test_db();
        let relay = relay(
            &db,
            Arc::new(ScriptedCompleter::answering(CORRECTED)),
            Arc::new(RecordingSink::rejecting("Unknown Channel")),
        );

        let outcome = relay.handle(&event()).await.unwrap();
        assert!(matches!(outcome, Outcome::Undelivered(ref e) if e.contains("Unknown Channel")));
        assert!(db.has_correction_for_message("m1").unwrap());
    }

    #[tokio::test]
    async fn test_dm_reply_mode() {
        let db = test_db();
        db.upsert_guild_settings(
            "g1",
            SettingsPatch {
                reply_mode: Some(ReplyMode::Dm),
                ..Default::default()
            },
        )
        .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let relay = relay(&db, Arc::new(ScriptedCompleter::answering(CORRECTED)), sink.clone());

        assert_eq!(relay.handle(&event()).await.unwrap(), Outcome::Delivered);
        assert_eq!(
            sink.sent(),
            vec![Sent::Direct {
                user_id: "42".to_string(),
                content: CORRECTED.to_string(),
            }]
        );
    }
}
