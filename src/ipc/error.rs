use serde_json::json;

use crate::error::RecordError;
use crate::portfolio::PortfolioError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// `db_code` replaces the generic query code for failed writes.
pub fn record_err(id: &str, e: &RecordError, db_code: &str) -> serde_json::Value {
    let code = match e {
        RecordError::Database(_) => db_code,
        other => other.code(),
    };
    err(id, code, e.to_string(), e.details())
}

pub fn portfolio_err(id: &str, e: &PortfolioError) -> serde_json::Value {
    match e {
        PortfolioError::Store(inner) => record_err(id, inner, "db_query_failed"),
        other => err(id, other.code(), other.to_string(), None),
    }
}
