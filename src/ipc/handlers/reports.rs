use crate::ipc::error::{err, ok, portfolio_err};
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::portfolio::code::QrCodeGenerator;
use crate::portfolio::sink::FileSink;
use crate::portfolio::{self, RenderOptions};
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;

fn handle_portfolio_pdf(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let student_id = match required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let out_path = match required_str(&req.params, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let (profile_base_url, code_options) = match setup::portfolio_settings(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let options = RenderOptions {
        profile_base_url,
        code_options,
        generated_at: Utc::now(),
        ..RenderOptions::default()
    };
    let mut sink = FileSink::new(&out_path);
    match portfolio::render_student_portfolio(
        conn,
        &student_id,
        &options,
        &QrCodeGenerator,
        &mut sink,
    ) {
        Ok(report) => {
            let mut result = json!(report);
            result["outPath"] = json!(sink.target().to_string_lossy());
            ok(&req.id, result)
        }
        Err(e) => {
            tracing::warn!(student_id = %student_id, error = %e, "portfolio render failed");
            portfolio_err(&req.id, &e)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.portfolioPdf" => Some(handle_portfolio_pdf(state, req)),
        _ => None,
    }
}
