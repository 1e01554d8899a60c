use super::rates::{rates_for_class, ScopeRates};
use super::standards::{derive_scope_standards, ThresholdPolicy};
use super::RetentionFraction;
use crate::model::ExamSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// 1-based exam number within the series.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub snapshot_id: Uuid,
    #[serde(flatten)]
    pub rates: ScopeRates,
}

/// Rate series for one class, one entry per snapshot in the order given.
///
/// Each snapshot is measured against standards derived from its own
/// students only, so entries are comparable in trend, not in absolute
/// cohort composition. Snapshots with nobody evaluated still produce an
/// (all-zero) entry.
pub fn build_history(
    snapshots: &[ExamSnapshot],
    retention: RetentionFraction,
    policy: &ThresholdPolicy,
) -> Vec<HistoryEntry> {
    snapshots
        .iter()
        .enumerate()
        .map(|(idx, snapshot)| {
            let standards =
                derive_scope_standards(&snapshot.students, &snapshot.subjects, retention, policy);
            HistoryEntry {
                index: idx + 1,
                timestamp: snapshot.created_at,
                snapshot_id: snapshot.id,
                rates: rates_for_class(&snapshot.students, &snapshot.students, &standards),
            }
        })
        .collect()
}
