use super::{evaluation_cohort, RetentionFraction, ScoringKey};
use crate::model::StudentRecord;

/// Population standard deviation of `subject` over the class's own top
/// `retention` share by total score. Larger values mean a more polarized
/// class. 0 when nobody is left after trimming.
pub fn compute_dispersion(
    class_students: &[StudentRecord],
    subject: &str,
    retention: RetentionFraction,
) -> f64 {
    let trimmed = evaluation_cohort(class_students, &ScoringKey::Total, retention);
    if trimmed.is_empty() {
        return 0.0;
    }
    let n = trimmed.len() as f64;
    let scores: Vec<f64> = trimmed.iter().map(|s| s.subject_score(subject)).collect();
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    variance.sqrt()
}
