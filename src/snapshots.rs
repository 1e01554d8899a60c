use crate::model::{ExamSnapshot, StudentRecord, SubjectDefinition};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Latest snapshot per class, ordered by class id.
///
/// With `date`, only snapshots created on that UTC calendar day are
/// considered. Between snapshots with identical timestamps the earlier one
/// in `snapshots` wins.
pub fn latest_per_class(snapshots: &[ExamSnapshot], date: Option<NaiveDate>) -> Vec<&ExamSnapshot> {
    let mut latest: BTreeMap<i64, &ExamSnapshot> = BTreeMap::new();
    for snapshot in snapshots {
        if date.is_some_and(|d| snapshot.created_at.date_naive() != d) {
            continue;
        }
        match latest.get(&snapshot.class_id) {
            Some(current) if current.created_at >= snapshot.created_at => {}
            _ => {
                latest.insert(snapshot.class_id, snapshot);
            }
        }
    }
    latest.into_values().collect()
}

/// One grade's population for a single exam round.
#[derive(Debug, Clone)]
pub struct GradePopulation<'a> {
    pub snapshots: Vec<&'a ExamSnapshot>,
    /// All students of the selected snapshots, in class id order.
    pub students: Vec<StudentRecord>,
    /// Subject list of the newest selected snapshot.
    pub subjects: Vec<SubjectDefinition>,
    pub grade_id: Option<String>,
    /// Day shown for the round: the requested date, or the newest snapshot's.
    pub date: Option<NaiveDate>,
}

impl GradePopulation<'_> {
    pub fn class_ids(&self) -> Vec<i64> {
        self.snapshots.iter().map(|s| s.class_id).collect()
    }

    pub fn class_students(&self, class_id: i64) -> Vec<StudentRecord> {
        self.students
            .iter()
            .filter(|s| s.class_id == class_id)
            .cloned()
            .collect()
    }
}

pub fn grade_population(snapshots: &[ExamSnapshot], date: Option<NaiveDate>) -> GradePopulation<'_> {
    let selected = latest_per_class(snapshots, date);
    let newest = selected
        .iter()
        .copied()
        .fold(None::<&ExamSnapshot>, |best, s| match best {
            Some(b) if b.created_at >= s.created_at => Some(b),
            _ => Some(s),
        });
    let students = selected
        .iter()
        .flat_map(|s| s.students.iter().cloned())
        .collect();

    GradePopulation {
        students,
        subjects: newest.map(|s| s.subjects.clone()).unwrap_or_default(),
        grade_id: newest.map(|s| s.grade_id.clone()),
        date: date.or_else(|| newest.map(|s| s.created_at.date_naive())),
        snapshots: selected,
    }
}

/// Snapshots of one class, oldest first. Equal timestamps keep input order.
pub fn class_series(snapshots: &[ExamSnapshot], class_id: i64) -> Vec<ExamSnapshot> {
    let mut series: Vec<ExamSnapshot> = snapshots
        .iter()
        .filter(|s| s.class_id == class_id)
        .cloned()
        .collect();
    series.sort_by_key(|s| s.created_at);
    series
}
