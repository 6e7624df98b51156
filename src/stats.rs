//! Per-guild correction statistics for the status report.

use crate::error::StoreError;
use crate::store::{CorrectionRecord, CorrectionStore};
use serde::Serialize;
use std::collections::BTreeMap;

/// Slice sizes used by the status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsBounds {
    pub top_users: usize,
    pub recent: usize,
}

impl Default for StatsBounds {
    fn default() -> Self {
        Self {
            top_users: 3,
            recent: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionStats {
    pub total_corrections: usize,
    pub user_stats: BTreeMap<String, usize>,
    pub recent_corrections: Vec<CorrectionRecord>,
}

/// Fold records into totals, per-user counts and the newest `bounds.recent`.
/// Equal timestamps keep their input order.
pub fn aggregate(records: Vec<CorrectionRecord>, bounds: StatsBounds) -> CorrectionStats {
    let mut user_stats = BTreeMap::new();
    for record in &records {
        *user_stats.entry(record.user_id.clone()).or_insert(0) += 1;
    }

    let total_corrections = records.len();
    let mut recent_corrections = records;
    recent_corrections.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent_corrections.truncate(bounds.recent);

    CorrectionStats {
        total_corrections,
        user_stats,
        recent_corrections,
    }
}

/// Read every record for the guild and aggregate it.
pub async fn guild_stats(
    store: &dyn CorrectionStore,
    guild_id: &str,
    bounds: StatsBounds,
) -> Result<CorrectionStats, StoreError> {
    let records = store.list_guild(guild_id).await?;
    Ok(aggregate(records, bounds))
}

impl CorrectionStats {
    /// Most corrected users, highest count first. Ties fall back to user-id order.
    pub fn top_users(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .user_stats
            .iter()
            .map(|(user, count)| (user.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}
