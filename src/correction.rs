//! Grammar assessment via the completion service.

use crate::error::CorrectionError;
use crate::event::MessageIdentity;
use crate::llm::Completer;
use crate::persona::{self, Verdict, FALLBACK_APOLOGY};
use crate::store::{CorrectionStore, NewCorrection};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionResult {
    NoCorrection,
    /// Text to send back to the author.
    Correction(String),
}

pub struct CorrectionEngine {
    completer: Arc<dyn Completer>,
    store: Arc<dyn CorrectionStore>,
    persona: String,
}

impl CorrectionEngine {
    pub fn new(
        completer: Arc<dyn Completer>,
        store: Arc<dyn CorrectionStore>,
        persona: impl Into<String>,
    ) -> Self {
        Self {
            completer,
            store,
            persona: persona.into(),
        }
    }

    /// Assess `text` and persist a genuine correction before returning it.
    ///
    /// Service failures and empty answers yield the fallback apology, which is
    /// returned for delivery but never stored.
    pub async fn correct(
        &self,
        text: &str,
        identity: &MessageIdentity,
    ) -> Result<CorrectionResult, CorrectionError> {
        let raw = match self.completer.complete(&self.persona, text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "Completion service failed for message {}: {}",
                    identity.message_id, e
                );
                return Ok(CorrectionResult::Correction(FALLBACK_APOLOGY.to_string()));
            }
        };

        let corrected = match persona::interpret(&raw) {
            Verdict::Perfect => {
                debug!("No correction needed for message {}", identity.message_id);
                return Ok(CorrectionResult::NoCorrection);
            }
            Verdict::Empty => {
                warn!(
                    "Completion service returned nothing for message {}",
                    identity.message_id
                );
                return Ok(CorrectionResult::Correction(FALLBACK_APOLOGY.to_string()));
            }
            Verdict::Corrected(corrected) => corrected,
        };

        let id = self
            .store
            .append(NewCorrection {
                original_message: text.to_string(),
                corrected_message: corrected.clone(),
                user_id: identity.user_id.clone(),
                channel_id: identity.channel_id.clone(),
                guild_id: identity.guild_id.clone(),
                message_id: identity.message_id.clone(),
            })
            .await?;

        info!(
            "Recorded correction {} for user {} in guild {}",
            id, identity.user_id, identity.guild_id
        );
        Ok(CorrectionResult::Correction(corrected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::persona::BUTLER_PERSONA;
    use crate::testing::{FailingStore, ScriptedCompleter};

    fn identity(message_id: &str) -> MessageIdentity {
        MessageIdentity {
            user_id: "42".to_string(),
            channel_id: "c1".to_string(),
            guild_id: "g1".to_string(),
            message_id: message_id.to_string(),
        }
    }

    fn test_db() -> Database {
        let db = Database::open(":memory:").unwrap();
        db.execute_init().unwrap();
        db
    }

    #[tokio::test]
    async fn test_sentinel_yields_no_correction_and_no_record() {
        let db = test_db();
        let completer = Arc::new(ScriptedCompleter::answering("PERFECT_GRAMMAR"));
        let engine = CorrectionEngine::new(completer.clone(), Arc::new(db.clone()), BUTLER_PERSONA);

        let result = engine
            .correct("The weather is nice today.", &identity("m1"))
            .await
            .unwrap();

        assert_eq!(result, CorrectionResult::NoCorrection);
        assert!(db.corrections_for_guild("g1", None).unwrap().is_empty());
        assert_eq!(completer.last_system().as_deref(), Some(BUTLER_PERSONA));
    }

    #[tokio::test]
    async fn test_decorated_sentinel_stores_nothing() {
        let db = test_db();
        for answer in ["\"PERFECT_GRAMMAR\".", "`perfect_grammar`."] {
            let engine = CorrectionEngine::new(
                Arc::new(ScriptedCompleter::answering(answer)),
                Arc::new(db.clone()),
                BUTLER_PERSONA,
            );
            let result = engine
                .correct("The weather is nice today.", &identity("m1"))
                .await
                .unwrap();
            assert_eq!(result, CorrectionResult::NoCorrection, "answer {:?}", answer);
        }
        assert!(!db.has_correction_for_message("m1").unwrap());
    }

    #[tokio::test]
    async fn test_correction_is_persisted_with_newer_timestamp() {
        let db = test_db();
        let completer = Arc::new(ScriptedCompleter::answering("Might I suggest: 'I don't know.'"));
        let engine = CorrectionEngine::new(completer, Arc::new(db.clone()), BUTLER_PERSONA);

        engine.correct("i dont no", &identity("m0")).await.unwrap();
        let prior = db.corrections_for_guild("g1", None).unwrap()[0].timestamp;

        let result = engine.correct("i dont no", &identity("m1")).await.unwrap();
        assert_eq!(
            result,
            CorrectionResult::Correction("Might I suggest: 'I don't know.'".to_string())
        );

        let records = db.corrections_for_guild("g1", None).unwrap();
        assert_eq!(records.len(), 2);
        let newest = &records[0];
        assert_eq!(newest.message_id, "m1");
        assert_eq!(newest.original_message, "i dont no");
        assert_eq!(newest.corrected_message, "Might I suggest: 'I don't know.'");
        assert_eq!(newest.user_id, "42");
        assert!(newest.timestamp > prior);
    }

    #[tokio::test]
    async fn test_service_failure_returns_unstored_apology() {
        let db = test_db();
        let engine = CorrectionEngine::new(
            Arc::new(ScriptedCompleter::failing("connection refused")),
            Arc::new(db.clone()),
            BUTLER_PERSONA,
        );

        let result = engine.correct("i dont no", &identity("m1")).await.unwrap();
        assert_eq!(result, CorrectionResult::Correction(FALLBACK_APOLOGY.to_string()));
        assert!(db.corrections_for_guild("g1", None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_answer_returns_unstored_apology() {
        let db = test_db();
        let engine = CorrectionEngine::new(
            Arc::new(ScriptedCompleter::answering("   ")),
            Arc::new(db.clone()),
            BUTLER_PERSONA,
        );

        let result = engine.correct("i dont no", &identity("m1")).await.unwrap();
        assert_eq!(result, CorrectionResult::Correction(FALLBACK_APOLOGY.to_string()));
        assert!(!db.has_correction_for_message("m1").unwrap());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let engine = CorrectionEngine::new(
            Arc::new(ScriptedCompleter::answering("Do say 'I don't know.'")),
            Arc::new(FailingStore),
            BUTLER_PERSONA,
        );

        let err = engine.correct("i dont no", &identity("m1")).await.unwrap_err();
        assert!(matches!(err, CorrectionError::Store(_)));
    }
}
