use crate::ipc::error::{calc_err, ok};
use crate::ipc::helpers::{optional, required};
use crate::ipc::types::{AppState, Request};
use crate::model::ExamSnapshot;
use crate::reports;
use chrono::NaiveDate;
use serde_json::json;

fn parse_round(req: &Request) -> Result<(Vec<ExamSnapshot>, Option<NaiveDate>), serde_json::Value> {
    let snapshots: Vec<ExamSnapshot> = required(req, "snapshots")?;
    let date: Option<NaiveDate> = optional(req, "date")?;
    Ok((snapshots, date))
}

fn handle_grade_standards(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (snapshots, date) = match parse_round(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!(reports::grade_standards(&snapshots, date, &state.policy)),
    )
}

fn handle_class_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (snapshots, date) = match parse_round(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id: i64 = match required(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match reports::class_report(&snapshots, class_id, date, &state.policy) {
        Ok(model) => ok(&req.id, json!(model)),
        Err(e) => calc_err(&req.id, e),
    }
}

fn handle_grade_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (snapshots, date) = match parse_round(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!(reports::grade_overview(&snapshots, date, &state.policy)),
    )
}

fn handle_class_history(state: &mut AppState, req: &Request) -> serde_json::Value {
    let snapshots: Vec<ExamSnapshot> = match required(req, "snapshots") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id: i64 = match required(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(
        &req.id,
        json!(reports::class_history(&snapshots, class_id, &state.policy)),
    )
}

fn handle_student_history(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let snapshots: Vec<ExamSnapshot> = match required(req, "snapshots") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id: i64 = match required(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name: String = match required(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match reports::student_history(&snapshots, class_id, &name) {
        Ok(model) => ok(&req.id, json!(model)),
        Err(e) => calc_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grade.standards" => Some(handle_grade_standards(state, req)),
        "class.report" => Some(handle_class_report(state, req)),
        "grade.overview" => Some(handle_grade_overview(state, req)),
        "class.history" => Some(handle_class_history(state, req)),
        "student.history" => Some(handle_student_history(state, req)),
        _ => None,
    }
}
