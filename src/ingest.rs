use crate::calc::CalcError;
use crate::model::{ExamSnapshot, StudentKey, StudentRecord, SubjectDefinition};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Score table as handed over by the spreadsheet importer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSnapshot {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub grade_id: serde_json::Value,
    pub class_id: i64,
    pub subjects: Vec<SubjectDefinition>,
    #[serde(default)]
    pub rows: Vec<RawStudentRow>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStudentRow {
    pub name: String,
    /// Subject name -> number or numeric string. Anything else scores 0.
    #[serde(default)]
    pub scores: serde_json::Map<String, serde_json::Value>,
}

/// Lenient score parse: numbers pass through, strings use their leading
/// decimal number ("86.5", " 90 ", "78分", "1e2"), everything else is 0.
pub fn parse_score(raw: Option<&serde_json::Value>) -> f64 {
    let v = match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => leading_number(s),
        _ => None,
    };
    v.filter(|x| x.is_finite()).unwrap_or(0.0)
}

fn leading_number(s: &str) -> Option<f64> {
    let t = s.trim_start();
    let bytes = t.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let mut digits = 0;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if digits == 0 {
        return None;
    }
    // Exponent counts only when at least one digit follows it ("1e2", not "1e").
    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits = bytes[exp_end..].iter().take_while(|b| b.is_ascii_digit()).count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    t[..end].parse::<f64>().ok()
}

fn grade_id_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn validate_subjects(subjects: &[SubjectDefinition]) -> Result<(), CalcError> {
    let mut seen = HashSet::new();
    for s in subjects {
        let name = s.name.trim();
        if name.is_empty() {
            return Err(CalcError::new("bad_params", "subject names must not be empty"));
        }
        if !seen.insert(name) {
            return Err(CalcError::new(
                "bad_params",
                format!("duplicate subject: {name}"),
            ));
        }
        if !s.max_score.is_finite() || s.max_score <= 0.0 {
            return Err(CalcError::new(
                "bad_params",
                format!("subject {name} must have a positive maxScore"),
            ));
        }
    }
    Ok(())
}

/// Builds an immutable snapshot: zero-filled subject scores, `total_score`
/// summed once over the snapshot's subjects, and a `StudentKey` from the
/// class id and row position.
pub fn ingest_snapshot(raw: RawSnapshot) -> Result<ExamSnapshot, CalcError> {
    validate_subjects(&raw.subjects)?;
    let subjects: Vec<SubjectDefinition> = raw
        .subjects
        .into_iter()
        .map(|s| SubjectDefinition {
            name: s.name.trim().to_string(),
            max_score: s.max_score,
        })
        .collect();

    let students = raw
        .rows
        .into_iter()
        .enumerate()
        .map(|(ordinal, row)| {
            let per_subject_score: BTreeMap<String, f64> = subjects
                .iter()
                .map(|s| (s.name.clone(), parse_score(row.scores.get(&s.name))))
                .collect();
            let total_score = per_subject_score.values().sum();
            StudentRecord {
                key: StudentKey {
                    class_id: raw.class_id,
                    ordinal,
                },
                name: row.name.trim().to_string(),
                class_id: raw.class_id,
                per_subject_score,
                total_score,
                grade_rank: None,
                class_rank: None,
            }
        })
        .collect();

    Ok(ExamSnapshot {
        id: raw.id.unwrap_or_else(Uuid::new_v4),
        grade_id: grade_id_string(&raw.grade_id),
        class_id: raw.class_id,
        subjects,
        students,
        created_at: raw.created_at.unwrap_or_else(Utc::now),
    })
}
