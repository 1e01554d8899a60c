use super::standards::ScopeStandards;
use super::{evaluation_cohort, round_off_2_decimals, CohortStandards, ScoringKey};
use crate::model::{StudentKey, StudentRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Three rates of one class against one set of standards, as percentages.
///
/// `total_rate` is the plain sum of the three and may exceed 100.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateResult {
    pub excellent_rate: f64,
    pub pass_rate: f64,
    pub comprehensive_rate: f64,
    pub total_rate: f64,
    pub evaluate_count: usize,
    pub evaluate_student_names: Vec<String>,
}

/// Rates for `class_students` counted only over those who made the
/// reference population's evaluation cohort.
///
/// The reference population is trimmed to `floor(len * fraction)` with
/// `standards.retention_fraction`, so standards and membership always agree
/// on the fraction. A population too small to keep anyone rates nobody. A
/// score meets a threshold when it is greater than or equal to it.
pub fn compute_rates(
    class_students: &[StudentRecord],
    reference_population: &[StudentRecord],
    standards: &CohortStandards,
    key: &ScoringKey,
) -> RateResult {
    if class_students.is_empty() {
        return RateResult::default();
    }

    let reference: HashSet<StudentKey> =
        evaluation_cohort(reference_population, key, standards.retention_fraction)
            .into_iter()
            .map(|s| s.key)
            .collect();
    let evaluated: Vec<&StudentRecord> = class_students
        .iter()
        .filter(|s| reference.contains(&s.key))
        .collect();
    if evaluated.is_empty() {
        return RateResult::default();
    }

    let count = evaluated.len();
    let rate = |threshold: f64| {
        let hits = evaluated.iter().filter(|s| key.score(s) >= threshold).count();
        round_off_2_decimals(100.0 * (hits as f64) / (count as f64))
    };
    let excellent_rate = rate(standards.excellent_standard);
    let pass_rate = rate(standards.pass_standard);
    let comprehensive_rate = rate(standards.comprehensive_standard);

    RateResult {
        excellent_rate,
        pass_rate,
        comprehensive_rate,
        // Only clears float noise; the addends already carry 2 decimals.
        total_rate: round_off_2_decimals(excellent_rate + pass_rate + comprehensive_rate),
        evaluate_count: count,
        evaluate_student_names: evaluated.iter().map(|s| s.name.clone()).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRates {
    pub subject: String,
    #[serde(flatten)]
    pub rates: RateResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRates {
    pub total: RateResult,
    pub subjects: Vec<SubjectRates>,
}

/// Total and per-subject rates of one class against standards derived from
/// `population` (the whole grade, or the class itself).
pub fn rates_for_class(
    class_students: &[StudentRecord],
    population: &[StudentRecord],
    standards: &ScopeStandards,
) -> ScopeRates {
    let total = compute_rates(class_students, population, &standards.total, &ScoringKey::Total);
    let subjects = standards
        .subjects
        .iter()
        .map(|s| SubjectRates {
            subject: s.subject.clone(),
            rates: compute_rates(
                class_students,
                population,
                &s.standards,
                &ScoringKey::Subject(s.subject.clone()),
            ),
        })
        .collect();
    ScopeRates { total, subjects }
}
