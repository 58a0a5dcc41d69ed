use rusqlite::Connection;
use serde_json::Value;

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

/// Resolves the open workspace connection or the `no_workspace` response.
pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(params: &Value, key: &str) -> Result<String, String> {
    let s = params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))?
        .trim();
    if s.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    Ok(s.to_string())
}

/// Absent, null and blank strings are all `None`.
pub fn optional_str(params: &Value, key: &str) -> Result<Option<String>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(_) => Err(format!("{} must be string", key)),
    }
}

pub fn required_i64(params: &Value, key: &str) -> Result<i64, String> {
    match params.get(key) {
        None | Some(Value::Null) => Err(format!("missing {}", key)),
        Some(v) => v.as_i64().ok_or_else(|| format!("{} must be integer", key)),
    }
}

pub fn optional_i64(params: &Value, key: &str) -> Result<Option<i64>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{} must be integer", key)),
    }
}

pub fn required_f64(params: &Value, key: &str) -> Result<f64, String> {
    match params.get(key) {
        None | Some(Value::Null) => Err(format!("missing {}", key)),
        Some(v) => v
            .as_f64()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("{} must be a number", key)),
    }
}

pub fn optional_f64(params: &Value, key: &str) -> Result<Option<f64>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_f64(params, key).map(Some),
    }
}
