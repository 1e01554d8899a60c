use crate::calc::{
    self, compute_dispersion, compute_rates, derive_standards, rank_students, CalcError,
    CohortStandards, ScoringKey,
};
use crate::ingest::{ingest_snapshot, RawSnapshot};
use crate::ipc::error::{calc_err, ok};
use crate::ipc::helpers::{optional, required, retention};
use crate::ipc::types::{AppState, Request};
use crate::model::StudentRecord;
use serde_json::json;
use tracing::info;

fn handle_snapshot_ingest(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let raw: RawSnapshot = match required(req, "snapshot") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match ingest_snapshot(raw) {
        Ok(snapshot) => {
            info!(
                snapshot = %snapshot.id,
                class_id = snapshot.class_id,
                students = snapshot.students.len(),
                "snapshot ingested"
            );
            ok(&req.id, json!(snapshot))
        }
        Err(e) => calc_err(&req.id, e),
    }
}

fn handle_students_rank(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let students: Vec<StudentRecord> = match required(req, "students") {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!({ "students": rank_students(&students) }))
}

fn handle_standards_derive(state: &mut AppState, req: &Request) -> serde_json::Value {
    let population: Vec<StudentRecord> = match required(req, "population") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let key: ScoringKey = match optional(req, "scoringKey") {
        Ok(v) => v.unwrap_or(ScoringKey::Total),
        Err(e) => return e,
    };
    let max_score: f64 = match required(req, "maxScore") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !max_score.is_finite() || max_score <= 0.0 {
        return calc_err(
            &req.id,
            CalcError::new("contract_violation", "maxScore must be positive"),
        );
    }
    let fraction = match retention(req, "retentionFraction", Some(state.policy.primary_retention)) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let standards = derive_standards(
        &population,
        &key,
        max_score,
        fraction,
        &state.policy.thresholds(),
    );
    ok(&req.id, json!(standards))
}

fn handle_rates_compute(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_students: Vec<StudentRecord> = match required(req, "classStudents") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let reference: Vec<StudentRecord> = match required(req, "referencePopulation") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let standards: CohortStandards = match required(req, "standards") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let key: ScoringKey = match optional(req, "scoringKey") {
        Ok(v) => v.unwrap_or(ScoringKey::Total),
        Err(e) => return e,
    };

    ok(
        &req.id,
        json!(compute_rates(&class_students, &reference, &standards, &key)),
    )
}

fn handle_dispersion_compute(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_students: Vec<StudentRecord> = match required(req, "classStudents") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject: String = match required(req, "subject") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let fraction = match retention(
        req,
        "retentionFraction",
        Some(state.policy.dispersion_retention),
    ) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let std_dev = compute_dispersion(&class_students, &subject, fraction);
    ok(
        &req.id,
        json!({
            "subject": subject,
            "stdDev": calc::round_off_2_decimals(std_dev),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "snapshot.ingest" => Some(handle_snapshot_ingest(state, req)),
        "students.rank" => Some(handle_students_rank(state, req)),
        "standards.derive" => Some(handle_standards_derive(state, req)),
        "rates.compute" => Some(handle_rates_compute(state, req)),
        "dispersion.compute" => Some(handle_dispersion_compute(state, req)),
        _ => None,
    }
}
