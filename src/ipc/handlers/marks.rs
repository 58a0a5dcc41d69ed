use crate::grading::{self, ExamType};
use crate::ipc::error::{err, ok, record_err};
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{
    db_conn, optional_f64, optional_str, required_f64, required_i64, required_str,
};
use crate::ipc::types::{AppState, Request};
use crate::marks::{self, MarkInput, MarkPatch, MarkQuery};
use crate::students;
use serde_json::{json, Value};

fn parse_exam_type(params: &Value) -> Result<ExamType, String> {
    match params.get("examType") {
        None | Some(Value::Null) => Ok(ExamType::Final),
        Some(v) => v.as_str().and_then(ExamType::parse).ok_or_else(|| {
            "examType must be one of: midterm, final, assignment, quiz, project".to_string()
        }),
    }
}

fn parse_mark_input(params: &Value) -> Result<MarkInput, String> {
    Ok(MarkInput {
        student_id: required_str(params, "studentId")?,
        subject_id: required_str(params, "subjectId")?,
        marks_obtained: required_f64(params, "marksObtained")?,
        max_marks: optional_f64(params, "maxMarks")?.unwrap_or(100.0),
        exam_type: parse_exam_type(params)?,
        semester: required_i64(params, "semester")?,
        academic_year: required_str(params, "academicYear")?,
        entered_by: optional_str(params, "enteredBy")?,
        remarks: optional_str(params, "remarks")?,
    })
}

fn parse_mark_patch(params: &Value) -> Result<MarkPatch, String> {
    let remarks = match params.get("remarks") {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(_)) => Some(optional_str(params, "remarks")?),
        Some(_) => return Err("remarks must be string or null".into()),
    };
    Ok(MarkPatch {
        marks_obtained: optional_f64(params, "marksObtained")?,
        max_marks: optional_f64(params, "maxMarks")?,
        remarks,
    })
}

fn handle_marks_write(state: &mut AppState, req: &Request, upsert: bool) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let input = match parse_mark_input(&req.params) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let res = if upsert {
        marks::upsert_mark(conn, &input)
    } else {
        marks::create_mark(conn, &input)
    };
    match res {
        Ok(stored) => ok(&req.id, json!(stored)),
        Err(e) => record_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_marks_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mark_id = match required_str(&req.params, "markId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let patch = match parse_mark_patch(&req.params) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match marks::update_mark(conn, &mark_id, &patch) {
        Ok(stored) => ok(&req.id, json!(stored)),
        Err(e) => record_err(&req.id, &e, "db_update_failed"),
    }
}

fn handle_marks_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let mark_id = match required_str(&req.params, "markId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match marks::delete_mark(conn, &mark_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => record_err(&req.id, &e, "db_delete_failed"),
    }
}

fn handle_marks_list(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    match students::get_student(conn, &student_id) {
        Ok(Some(_)) => {}
        Ok(None) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return record_err(&req.id, &e, "db_query_failed"),
    }
    let policy = match setup::credit_policy(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let query = MarkQuery {
        student_id: Some(&student_id),
        subject_id: None,
        filters: &filters,
    };
    match marks::load_marks(conn, &query) {
        Ok(rows) => {
            let graded: Vec<_> = rows.iter().map(|r| r.graded(&policy)).collect();
            ok(&req.id, json!({ "marks": graded }))
        }
        Err(e) => record_err(&req.id, &e, "db_query_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marks.create" => Some(handle_marks_write(state, req, false)),
        "marks.upsert" => Some(handle_marks_write(state, req, true)),
        "marks.update" => Some(handle_marks_update(state, req)),
        "marks.delete" => Some(handle_marks_delete(state, req)),
        "marks.list" => Some(handle_marks_list(state, req)),
        _ => None,
    }
}
