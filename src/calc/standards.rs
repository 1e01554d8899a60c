use super::{evaluate_count, top_by, RetentionFraction, ScoringKey};
use crate::model::{total_max_score, StudentRecord, SubjectDefinition};
use serde::{Deserialize, Serialize};

/// Fractions that turn an evaluation cohort into thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    /// Share of the evaluation cohort whose boundary score is the
    /// excellence bar.
    pub excellent_fraction: f64,
    /// Share of the key's maximum score that passes.
    pub pass_fraction: f64,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            excellent_fraction: 0.2,
            pass_fraction: 0.6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortStandards {
    pub excellent_standard: f64,
    pub pass_standard: f64,
    pub comprehensive_standard: f64,
    pub evaluate_count: usize,
    /// Trimming these thresholds were derived under. Rates computed against
    /// them trim the reference population with the same fraction.
    pub retention_fraction: RetentionFraction,
}

impl CohortStandards {
    pub fn empty(retention_fraction: RetentionFraction) -> Self {
        Self {
            excellent_standard: 0.0,
            pass_standard: 0.0,
            comprehensive_standard: 0.0,
            evaluate_count: 0,
            retention_fraction,
        }
    }
}

/// Derives the three thresholds for `key` from the top `retention` share of
/// `population`.
///
/// - excellent: score at position `floor(evaluate_count * excellent_fraction)`
///   (1-based) of the evaluation cohort, or the top score when that is 0
/// - pass: `pass_fraction * max_score`, independent of the population
/// - comprehensive: mean score of the evaluation cohort
pub fn derive_standards(
    population: &[StudentRecord],
    key: &ScoringKey,
    max_score: f64,
    retention: RetentionFraction,
    policy: &ThresholdPolicy,
) -> CohortStandards {
    let cohort = top_by(population, key, evaluate_count(population.len(), retention));
    if cohort.is_empty() {
        return CohortStandards::empty(retention);
    }
    let evaluate_count = cohort.len();

    let boundary = ((evaluate_count as f64) * policy.excellent_fraction).floor() as usize;
    let excellent_idx = boundary.saturating_sub(1).min(evaluate_count - 1);
    let excellent_standard = key.score(cohort[excellent_idx]);

    let sum: f64 = cohort.iter().map(|s| key.score(s)).sum();

    CohortStandards {
        excellent_standard,
        pass_standard: max_score * policy.pass_fraction,
        comprehensive_standard: sum / (evaluate_count as f64),
        evaluate_count,
        retention_fraction: retention,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStandards {
    pub subject: String,
    #[serde(flatten)]
    pub standards: CohortStandards,
}

/// Total-score and per-subject standards for one population scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeStandards {
    pub total: CohortStandards,
    pub subjects: Vec<SubjectStandards>,
}

/// Standards for the total score and every subject, each subject trimmed by
/// its own ordering of `population`.
pub fn derive_scope_standards(
    population: &[StudentRecord],
    subjects: &[SubjectDefinition],
    retention: RetentionFraction,
    policy: &ThresholdPolicy,
) -> ScopeStandards {
    let total = derive_standards(
        population,
        &ScoringKey::Total,
        total_max_score(subjects),
        retention,
        policy,
    );
    let subjects = subjects
        .iter()
        .map(|subject| SubjectStandards {
            subject: subject.name.clone(),
            standards: derive_standards(
                population,
                &ScoringKey::Subject(subject.name.clone()),
                subject.max_score,
                retention,
                policy,
            ),
        })
        .collect();
    ScopeStandards { total, subjects }
}
