//! Grade-level views assembled from the engine: grade standards, a class
//! report, the per-subject overview handed to the narrative service, a
//! class's rate history and one student's score history.

use crate::calc::{
    self, build_history, competition_ranks, compute_dispersion, compute_rates,
    derive_scope_standards, derive_standards, rank_students, rates_for_class, round_off_2_decimals,
    CalcError, HistoryEntry, ScopeRates, ScopeStandards, ScoringKey,
};
use crate::config::RatePolicy;
use crate::model::{ExamSnapshot, StudentRecord};
use crate::snapshots::{class_series, grade_population};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeStandardsModel {
    pub grade_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub class_ids: Vec<i64>,
    pub student_count: usize,
    pub standards: ScopeStandards,
}

pub fn grade_standards(
    snapshots: &[ExamSnapshot],
    date: Option<NaiveDate>,
    policy: &RatePolicy,
) -> GradeStandardsModel {
    let pop = grade_population(snapshots, date);
    let standards = derive_scope_standards(
        &pop.students,
        &pop.subjects,
        policy.primary_retention,
        &policy.thresholds(),
    );
    GradeStandardsModel {
        grade_id: pop.grade_id.clone(),
        date: pop.date,
        class_ids: pop.class_ids(),
        student_count: pop.students.len(),
        standards,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReportModel {
    pub grade_id: Option<String>,
    pub class_id: i64,
    pub date: Option<NaiveDate>,
    /// Class members with grade and class ranks, best first.
    pub students: Vec<StudentRecord>,
    pub standards: ScopeStandards,
    pub rates: ScopeRates,
}

/// Rates of one class against standards of the whole grade's latest round.
pub fn class_report(
    snapshots: &[ExamSnapshot],
    class_id: i64,
    date: Option<NaiveDate>,
    policy: &RatePolicy,
) -> Result<ClassReportModel, CalcError> {
    let pop = grade_population(snapshots, date);
    if !pop.class_ids().contains(&class_id) {
        return Err(CalcError::new(
            "not_found",
            format!("no snapshot for class {class_id}"),
        )
        .with_details(json!({ "classId": class_id, "classIds": pop.class_ids() })));
    }

    let standards = derive_scope_standards(
        &pop.students,
        &pop.subjects,
        policy.primary_retention,
        &policy.thresholds(),
    );
    let class_students = pop.class_students(class_id);
    let rates = rates_for_class(&class_students, &pop.students, &standards);
    let students = rank_students(&pop.students)
        .into_iter()
        .filter(|s| s.class_id == class_id)
        .collect();

    Ok(ClassReportModel {
        grade_id: pop.grade_id.clone(),
        class_id,
        date: pop.date,
        students,
        standards,
        rates,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewRow {
    pub class_id: i64,
    pub excellent_rate: f64,
    pub comprehensive_rate: f64,
    pub pass_rate: f64,
    pub total_rate: f64,
    /// Standing among the grade's classes by `total_rate`; `None` for a
    /// class with no rate at all.
    pub rank: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDispersion {
    pub class_id: i64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectOverview {
    pub subject: String,
    pub rows: Vec<OverviewRow>,
    pub dispersion: Vec<ClassDispersion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOverviewModel {
    pub grade_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub subjects: Vec<SubjectOverview>,
}

/// Per-subject class standings for one exam round, plus each class's score
/// dispersion in that subject.
pub fn grade_overview(
    snapshots: &[ExamSnapshot],
    date: Option<NaiveDate>,
    policy: &RatePolicy,
) -> GradeOverviewModel {
    let pop = grade_population(snapshots, date);
    let thresholds = policy.thresholds();
    let classes: Vec<(i64, Vec<StudentRecord>)> = pop
        .class_ids()
        .into_iter()
        .map(|id| (id, pop.class_students(id)))
        .collect();

    let subjects = pop
        .subjects
        .iter()
        .map(|subject| {
            let key = ScoringKey::Subject(subject.name.clone());
            let standards = derive_standards(
                &pop.students,
                &key,
                subject.max_score,
                policy.overview_retention,
                &thresholds,
            );

            let mut rows: Vec<OverviewRow> = classes
                .iter()
                .map(|(class_id, members)| {
                    let r = compute_rates(members, &pop.students, &standards, &key);
                    OverviewRow {
                        class_id: *class_id,
                        excellent_rate: r.excellent_rate,
                        comprehensive_rate: r.comprehensive_rate,
                        pass_rate: r.pass_rate,
                        total_rate: r.total_rate,
                        rank: None,
                    }
                })
                .collect();
            rank_rows(&mut rows);

            let dispersion = classes
                .iter()
                .map(|(class_id, members)| ClassDispersion {
                    class_id: *class_id,
                    std_dev: round_off_2_decimals(compute_dispersion(
                        members,
                        &subject.name,
                        policy.dispersion_retention,
                    )),
                })
                .collect();

            SubjectOverview {
                subject: subject.name.clone(),
                rows,
                dispersion,
            }
        })
        .collect();

    GradeOverviewModel {
        grade_id: pop.grade_id.clone(),
        date: pop.date,
        subjects,
    }
}

fn rank_rows(rows: &mut [OverviewRow]) {
    rows.sort_by(|a, b| calc::cmp_desc(a.total_rate, b.total_rate));
    let totals: Vec<f64> = rows.iter().map(|r| r.total_rate).collect();
    for (row, rank) in rows.iter_mut().zip(competition_ranks(&totals)) {
        row.rank = (row.total_rate != 0.0).then_some(rank);
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassHistoryModel {
    pub class_id: i64,
    pub entries: Vec<HistoryEntry>,
}

pub fn class_history(
    snapshots: &[ExamSnapshot],
    class_id: i64,
    policy: &RatePolicy,
) -> ClassHistoryModel {
    let series = class_series(snapshots, class_id);
    ClassHistoryModel {
        class_id,
        entries: build_history(&series, policy.history_retention, &policy.thresholds()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistoryEntry {
    /// 1-based exam number within the class series, counting exams the
    /// student missed.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub snapshot_id: Uuid,
    pub total_score: f64,
    /// Zero-filled score for every subject of that exam.
    pub scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistoryModel {
    pub class_id: i64,
    pub name: String,
    pub entries: Vec<StudentHistoryEntry>,
}

/// Distinct student names across a class's snapshots, first seen first.
fn series_names(series: &[ExamSnapshot]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for student in series.iter().flat_map(|s| s.students.iter()) {
        if !names.contains(&student.name) {
            names.push(student.name.clone());
        }
    }
    names
}

/// One student's scores across the class's exams, oldest first.
///
/// Row positions change between uploads, so the student is matched by name
/// within each snapshot (first match wins). Exams without that name are
/// skipped.
pub fn student_history(
    snapshots: &[ExamSnapshot],
    class_id: i64,
    name: &str,
) -> Result<StudentHistoryModel, CalcError> {
    let name = name.trim();
    let series = class_series(snapshots, class_id);
    let entries: Vec<StudentHistoryEntry> = series
        .iter()
        .enumerate()
        .filter_map(|(idx, snapshot)| {
            let student = snapshot.students.iter().find(|s| s.name == name)?;
            Some(StudentHistoryEntry {
                index: idx + 1,
                timestamp: snapshot.created_at,
                snapshot_id: snapshot.id,
                total_score: student.total_score,
                scores: snapshot
                    .subjects
                    .iter()
                    .map(|subject| (subject.name.clone(), student.subject_score(&subject.name)))
                    .collect(),
            })
        })
        .collect();

    if entries.is_empty() {
        return Err(CalcError::new(
            "not_found",
            format!("no student named {name:?} in class {class_id}"),
        )
        .with_details(json!({ "classId": class_id, "names": series_names(&series) })));
    }

    Ok(StudentHistoryModel {
        class_id,
        name: name.to_string(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::testing::student;
    use crate::model::SubjectDefinition;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn snap(class_id: i64, day: u32, scores: &[(f64, f64)]) -> ExamSnapshot {
        ExamSnapshot {
            id: Uuid::new_v4(),
            grade_id: "5".into(),
            class_id,
            subjects: vec![
                SubjectDefinition { name: "chinese".into(), max_score: 100.0 },
                SubjectDefinition { name: "math".into(), max_score: 100.0 },
            ],
            students: scores
                .iter()
                .enumerate()
                .map(|(i, (c, m))| {
                    student(
                        class_id,
                        i,
                        &format!("c{class_id}-{i}"),
                        &[("chinese", *c), ("math", *m)],
                    )
                })
                .collect(),
            created_at: Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap(),
        }
    }

    fn row(class_id: i64, total_rate: f64) -> OverviewRow {
        OverviewRow {
            class_id,
            excellent_rate: 0.0,
            comprehensive_rate: 0.0,
            pass_rate: 0.0,
            total_rate,
            rank: None,
        }
    }

    #[test]
    fn rank_rows_uses_competition_ranking_and_skips_zero() {
        let mut rows = vec![row(1, 200.0), row(2, 250.0), row(3, 0.0), row(4, 250.0)];
        rank_rows(&mut rows);
        let got: Vec<(i64, Option<usize>)> = rows.iter().map(|r| (r.class_id, r.rank)).collect();
        assert_eq!(got, vec![(2, Some(1)), (4, Some(1)), (1, Some(3)), (3, None)]);
    }

    #[test]
    fn class_report_ranks_against_whole_grade() {
        let snaps = vec![
            snap(1, 1, &[(90.0, 95.0), (60.0, 50.0)]),
            snap(2, 1, &[(80.0, 85.0), (70.0, 75.0), (30.0, 20.0)]),
        ];
        let report = class_report(&snaps, 2, None, &RatePolicy::default()).expect("report");

        let ranks: Vec<(Option<usize>, Option<usize>)> = report
            .students
            .iter()
            .map(|s| (s.grade_rank, s.class_rank))
            .collect();
        assert_eq!(ranks, vec![(Some(2), Some(1)), (Some(3), Some(2)), (Some(5), Some(3))]);
        // floor(5 * 0.9) = 4: the 50-point student is trimmed from the grade.
        assert_eq!(report.standards.total.evaluate_count, 4);
        assert_eq!(report.rates.total.evaluate_count, 2);
        assert_eq!(report.rates.subjects.len(), 2);
    }

    #[test]
    fn class_report_for_unknown_class_is_not_found() {
        let snaps = vec![snap(1, 1, &[(90.0, 95.0)])];
        let e = class_report(&snaps, 7, None, &RatePolicy::default()).unwrap_err();
        assert_eq!(e.code, "not_found");
    }

    #[test]
    fn overview_lists_every_class_per_subject() {
        let snaps = vec![
            snap(1, 1, &[(95.0, 40.0), (90.0, 45.0), (85.0, 50.0)]),
            snap(2, 1, &[(50.0, 95.0), (55.0, 90.0), (40.0, 85.0)]),
            snap(3, 1, &[]),
        ];
        let overview = grade_overview(&snaps, None, &RatePolicy::default());

        assert_eq!(overview.grade_id.as_deref(), Some("5"));
        assert_eq!(overview.date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert_eq!(overview.subjects.len(), 2);

        let chinese = &overview.subjects[0];
        assert_eq!(chinese.subject, "chinese");
        assert_eq!(chinese.rows.len(), 3);
        assert_eq!(chinese.rows[0].class_id, 1);
        assert_eq!(chinese.rows[0].rank, Some(1));
        let empty = chinese.rows.iter().find(|r| r.class_id == 3).unwrap();
        assert_eq!(empty.total_rate, 0.0);
        assert_eq!(empty.rank, None);

        let math = &overview.subjects[1];
        assert_eq!(math.rows[0].class_id, 2);

        let spread: Vec<i64> = chinese.dispersion.iter().map(|d| d.class_id).collect();
        assert_eq!(spread, vec![1, 2, 3]);
        assert!(chinese.dispersion.iter().all(|d| d.std_dev >= 0.0));
    }

    #[test]
    fn grade_standards_cover_total_and_subjects() {
        let snaps = vec![
            snap(1, 1, &[(90.0, 80.0)]),
            snap(1, 2, &[(70.0, 60.0), (50.0, 40.0)]),
            snap(2, 1, &[(60.0, 60.0)]),
        ];
        let model = grade_standards(&snaps, None, &RatePolicy::default());
        assert_eq!(model.class_ids, vec![1, 2]);
        assert_eq!(model.student_count, 3);
        assert!((model.standards.total.pass_standard - 120.0).abs() < 1e-9);
        assert_eq!(model.standards.subjects.len(), 2);
    }

    #[test]
    fn student_history_follows_one_name_through_the_series() {
        let mut later = snap(1, 9, &[(70.0, 65.0), (88.0, 92.0)]);
        later.students[1].name = "Li Wei".into();
        let missed = snap(1, 5, &[(50.0, 50.0)]);
        let mut first = snap(1, 2, &[(80.0, 75.0)]);
        first.students[0].name = "Li Wei".into();
        let mut elsewhere = snap(2, 3, &[(10.0, 10.0)]);
        elsewhere.students[0].name = "Li Wei".into();
        let snaps = vec![later, missed, first, elsewhere];

        let model = student_history(&snaps, 1, " Li Wei ").expect("history");
        assert_eq!(model.name, "Li Wei");
        let got: Vec<(usize, f64)> = model.entries.iter().map(|e| (e.index, e.total_score)).collect();
        assert_eq!(got, vec![(1, 155.0), (3, 180.0)]);
        assert_eq!(model.entries[0].snapshot_id, snaps[2].id);
        assert_eq!(model.entries[1].scores.get("math"), Some(&92.0));
        assert_eq!(model.entries[1].scores.len(), 2);
    }

    #[test]
    fn student_history_for_unknown_name_lists_known_names() {
        let snaps = vec![snap(1, 1, &[(90.0, 80.0)]), snap(1, 2, &[(90.0, 80.0), (1.0, 1.0)])];
        let e = student_history(&snaps, 1, "Nobody").unwrap_err();
        assert_eq!(e.code, "not_found");
        assert_eq!(
            e.details.and_then(|d| d.get("names").cloned()),
            Some(json!(["c1-0", "c1-1"]))
        );
    }

    #[test]
    fn class_history_is_chronological() {
        let snaps = vec![
            snap(1, 9, &[(90.0, 80.0)]),
            snap(2, 1, &[(60.0, 60.0)]),
            snap(1, 2, &[]),
        ];
        let model = class_history(&snaps, 1, &RatePolicy::default());
        assert_eq!(model.entries.len(), 2);
        assert_eq!(model.entries[0].snapshot_id, snaps[2].id);
        assert_eq!(model.entries[1].snapshot_id, snaps[0].id);
        assert_eq!(model.entries[0].rates.total.evaluate_count, 0);
        // A lone student is below floor(1 * 0.95) and is not rated.
        assert_eq!(model.entries[1].rates.total.evaluate_count, 0);
        assert_eq!(model.entries[1].rates.total.total_rate, 0.0);
    }
}
