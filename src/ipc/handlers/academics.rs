use crate::grading;
use crate::ipc::error::{err, ok, record_err};
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_academics_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let student_id = match required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let filters = match grading::parse_academic_filters(req.params.get("filters")) {
        Ok(v) => v,
        Err(e) => return record_err(&req.id, &e, "db_query_failed"),
    };
    let policy = match setup::credit_policy(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    match grading::compute_student_academic_summary(conn, &student_id, &filters, &policy) {
        Ok(report) => ok(&req.id, json!(report)),
        Err(e) => record_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_academics_subject_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let subject_id = match required_str(&req.params, "subjectId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let filters = match grading::parse_academic_filters(req.params.get("filters")) {
        Ok(v) => v,
        Err(e) => return record_err(&req.id, &e, "db_query_failed"),
    };
    match grading::compute_subject_stats_for(conn, &subject_id, &filters) {
        Ok(report) => ok(&req.id, json!(report)),
        Err(e) => record_err(&req.id, &e, "db_query_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "academics.summary" => Some(handle_academics_summary(state, req)),
        "academics.subjectStats" => Some(handle_academics_subject_stats(state, req)),
        _ => None,
    }
}
