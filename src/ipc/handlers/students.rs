use crate::ipc::error::{err, ok, record_err};
use crate::ipc::helpers::{db_conn, optional_i64, optional_str, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::students::{self, NewStudent, NewSubject};
use serde_json::{json, Value};

fn parse_new_student(params: &Value) -> Result<NewStudent, String> {
    Ok(NewStudent {
        name: required_str(params, "name")?,
        student_code: required_str(params, "studentId")?,
        department: optional_str(params, "department")?,
        email: optional_str(params, "email")?,
    })
}

fn parse_new_subject(params: &Value) -> Result<NewSubject, String> {
    Ok(NewSubject {
        name: required_str(params, "name")?,
        code: required_str(params, "code")?,
        credits: required_i64(params, "credits")?,
        semester: required_i64(params, "semester")?,
        department: optional_str(params, "department")?,
    })
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let input = match parse_new_student(&req.params) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match students::create_student(conn, &input) {
        Ok(s) => ok(&req.id, json!({ "student": s })),
        Err(e) => record_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let id = match required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match students::get_student(conn, &id) {
        Ok(Some(s)) => ok(&req.id, json!({ "student": s })),
        Ok(None) => err(&req.id, "not_found", "student not found", None),
        Err(e) => record_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match students::list_students(conn) {
        Ok(rows) => ok(&req.id, json!({ "students": rows })),
        Err(e) => record_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let input = match parse_new_subject(&req.params) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match students::create_subject(conn, &input) {
        Ok(s) => ok(&req.id, json!({ "subject": s })),
        Err(e) => record_err(&req.id, &e, "db_insert_failed"),
    }
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let semester = match optional_i64(&req.params, "semester") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match students::list_subjects(conn, semester) {
        Ok(rows) => ok(&req.id, json!({ "subjects": rows })),
        Err(e) => record_err(&req.id, &e, "db_query_failed"),
    }
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let id = match required_str(&req.params, "subjectId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    match students::delete_subject(conn, &id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => record_err(&req.id, &e, "db_delete_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.create" => Some(handle_students_create(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        _ => None,
    }
}
