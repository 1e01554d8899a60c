//! Cohort statistics engine.
//!
//! Every function in this module tree is a pure function of its inputs:
//! ranking, threshold derivation from a trimmed evaluation cohort, the
//! three rates (excellent / pass / comprehensive) and score dispersion.
//! Degenerate inputs (no students, no eligible students) resolve to
//! zero-valued results; only caller contract violations produce a
//! [`CalcError`].

use crate::model::StudentRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub mod dispersion;
pub mod history;
pub mod rank;
pub mod rates;
pub mod standards;

pub use dispersion::compute_dispersion;
pub use history::{build_history, HistoryEntry};
pub use rank::{competition_ranks, rank_students};
pub use rates::{compute_rates, rates_for_class, ScopeRates};
pub use standards::{
    derive_scope_standards, derive_standards, CohortStandards, ScopeStandards, ThresholdPolicy,
};

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CalcError {}

/// Share of a population kept in the evaluation cohort, always in `(0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct RetentionFraction(f64);

impl RetentionFraction {
    /// Grade-scope trimming used by the class and grade pages.
    pub const NINETY: RetentionFraction = RetentionFraction(0.90);
    /// Overview, class-own history and dispersion trimming.
    pub const NINETY_FIVE: RetentionFraction = RetentionFraction(0.95);

    pub fn new(value: f64) -> Result<Self, CalcError> {
        if !value.is_finite() || value <= 0.0 || value > 1.0 {
            return Err(CalcError::new(
                "contract_violation",
                format!("retention fraction must be in (0, 1], got {value}"),
            ));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for RetentionFraction {
    type Error = CalcError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        RetentionFraction::new(value)
    }
}

impl From<RetentionFraction> for f64 {
    fn from(value: RetentionFraction) -> Self {
        value.0
    }
}

/// Which score a cohort is ordered and measured by.
///
/// Serialized as `"total"` or `{"subject": "<name>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoringKey {
    Total,
    Subject(String),
}

impl ScoringKey {
    pub fn score(&self, student: &StudentRecord) -> f64 {
        match self {
            ScoringKey::Total => student.total_score,
            ScoringKey::Subject(name) => student.subject_score(name),
        }
    }
}

/// Two-decimal rounding matching the percentages shown to teachers:
/// `Int(100*x + 0.5) / 100`
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

/// `floor(len * fraction)`: how many of a population make the evaluation
/// cohort when membership is being tested.
pub fn retained_count(len: usize, fraction: RetentionFraction) -> usize {
    (((len as f64) * fraction.get()).floor() as usize).min(len)
}

/// [`retained_count`] raised to 1 for a non-empty population, so thresholds
/// always come from at least one score.
pub fn evaluate_count(len: usize, fraction: RetentionFraction) -> usize {
    if len == 0 {
        return 0;
    }
    retained_count(len, fraction).max(1)
}

pub(crate) fn cmp_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Population ordered by `key`, highest first. Equal scores keep their input
/// order.
pub fn sorted_desc<'a>(population: &'a [StudentRecord], key: &ScoringKey) -> Vec<&'a StudentRecord> {
    let mut sorted: Vec<&StudentRecord> = population.iter().collect();
    sorted.sort_by(|a, b| cmp_desc(key.score(a), key.score(b)));
    sorted
}

/// Top `count` members of `population` by `key`.
pub fn top_by<'a>(
    population: &'a [StudentRecord],
    key: &ScoringKey,
    count: usize,
) -> Vec<&'a StudentRecord> {
    let mut cohort = sorted_desc(population, key);
    cohort.truncate(count);
    cohort
}

/// Top `floor(len * fraction)` members of `population` by `key`. Empty for a
/// population too small to keep anyone.
pub fn evaluation_cohort<'a>(
    population: &'a [StudentRecord],
    key: &ScoringKey,
    fraction: RetentionFraction,
) -> Vec<&'a StudentRecord> {
    top_by(population, key, retained_count(population.len(), fraction))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_off_two_decimals() {
        assert_eq!(round_off_2_decimals(0.0), 0.0);
        assert_eq!(round_off_2_decimals(100.0 / 3.0), 33.33);
        assert_eq!(round_off_2_decimals(200.0 / 3.0), 66.67);
        assert_eq!(round_off_2_decimals(100.0), 100.0);
    }

    #[test]
    fn retention_fraction_rejects_out_of_range() {
        assert!(RetentionFraction::new(0.9).is_ok());
        assert!(RetentionFraction::new(1.0).is_ok());
        for bad in [0.0, -0.1, 1.01, f64::NAN, f64::INFINITY] {
            let e = RetentionFraction::new(bad).expect_err("should reject");
            assert_eq!(e.code, "contract_violation");
        }
    }

    #[test]
    fn evaluate_count_floors_and_keeps_one() {
        assert_eq!(evaluate_count(10, RetentionFraction::NINETY), 9);
        assert_eq!(evaluate_count(20, RetentionFraction::NINETY_FIVE), 19);
        assert_eq!(evaluate_count(40, RetentionFraction::NINETY_FIVE), 38);
        assert_eq!(evaluate_count(1, RetentionFraction::NINETY), 1);
        assert_eq!(evaluate_count(0, RetentionFraction::NINETY), 0);
    }

    #[test]
    fn retained_count_is_a_plain_floor() {
        assert_eq!(retained_count(10, RetentionFraction::NINETY), 9);
        assert_eq!(retained_count(1, RetentionFraction::NINETY_FIVE), 0);
        assert_eq!(retained_count(2, RetentionFraction::NINETY_FIVE), 1);
        assert_eq!(retained_count(3, RetentionFraction::new(1.0).unwrap()), 3);
        assert!(evaluation_cohort(&testing::by_totals(1, &[80.0]), &ScoringKey::Total, RetentionFraction::NINETY).is_empty());
    }

    #[test]
    fn scoring_key_serializes_as_total_or_subject() {
        assert_eq!(serde_json::to_value(ScoringKey::Total).unwrap(), "total");
        let key: ScoringKey = serde_json::from_str(r#"{"subject":"math"}"#).unwrap();
        assert_eq!(key, ScoringKey::Subject("math".into()));
    }

    #[test]
    fn retention_fraction_deserializes_with_validation() {
        let ok: RetentionFraction = serde_json::from_str("0.95").unwrap();
        assert_eq!(ok.get(), 0.95);
        assert!(serde_json::from_str::<RetentionFraction>("1.5").is_err());
    }

    #[test]
    fn sorted_desc_is_stable_for_ties() {
        let pop = testing::by_totals(1, &[50.0, 70.0, 50.0, 70.0]);
        let order: Vec<usize> = sorted_desc(&pop, &ScoringKey::Total)
            .iter()
            .map(|s| s.key.ordinal)
            .collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }
}
