use super::cmp_desc;
use crate::model::StudentRecord;
use std::collections::HashMap;

/// Returns ranked copies of `students` in grade-rank order.
///
/// `grade_rank` is the 1-based position by total score across everyone;
/// `class_rank` is the position within the student's class. Ranks are never
/// shared: equal totals are ordered by input position.
pub fn rank_students(students: &[StudentRecord]) -> Vec<StudentRecord> {
    let mut ranked = students.to_vec();
    ranked.sort_by(|a, b| cmp_desc(a.total_score, b.total_score));

    // A class's members already appear in stable total order here, so the
    // per-class position is the within-class rank.
    let mut seen_in_class: HashMap<i64, usize> = HashMap::new();
    for (idx, student) in ranked.iter_mut().enumerate() {
        student.grade_rank = Some(idx + 1);
        let n = seen_in_class.entry(student.class_id).or_insert(0);
        *n += 1;
        student.class_rank = Some(*n);
    }
    ranked
}

/// Standard competition ranking ("1224") over values already sorted
/// descending: equal values share a rank, the next distinct value takes its
/// 1-based position.
pub fn competition_ranks(sorted_desc: &[f64]) -> Vec<usize> {
    let mut out = Vec::with_capacity(sorted_desc.len());
    let mut current = 1;
    for (idx, v) in sorted_desc.iter().enumerate() {
        if idx > 0 && *v < sorted_desc[idx - 1] {
            current = idx + 1;
        }
        out.push(current);
    }
    out
}
