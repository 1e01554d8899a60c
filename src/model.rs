use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDefinition {
    pub name: String,
    pub max_score: f64,
}

/// Identity used for cohort membership. Two students with the same display
/// name in different classes never share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentKey {
    pub class_id: i64,
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub key: StudentKey,
    pub name: String,
    pub class_id: i64,
    #[serde(default)]
    pub per_subject_score: BTreeMap<String, f64>,
    pub total_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_rank: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_rank: Option<usize>,
}

impl StudentRecord {
    /// Score for `subject`; absent or non-finite scores count as 0.
    pub fn subject_score(&self, subject: &str) -> f64 {
        self.per_subject_score
            .get(subject)
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

/// One uploaded score table for one class. Never mutated after ingestion;
/// a re-upload produces a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSnapshot {
    pub id: Uuid,
    pub grade_id: String,
    pub class_id: i64,
    pub subjects: Vec<SubjectDefinition>,
    pub students: Vec<StudentRecord>,
    pub created_at: DateTime<Utc>,
}

/// Maximum attainable total score: the sum of every subject's maximum.
pub fn total_max_score(subjects: &[SubjectDefinition]) -> f64 {
    subjects.iter().map(|s| s.max_score).sum()
}
