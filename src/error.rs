use serde_json::json;
use thiserror::Error;

/// Failures raised by the record stores and the grading engine.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },
    #[error("{message}")]
    Conflict {
        code: &'static str,
        message: String,
        existing_id: String,
    },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl RecordError {
    pub fn validation(message: impl Into<String>) -> Self {
        RecordError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        RecordError::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn conflict(
        code: &'static str,
        message: impl Into<String>,
        existing_id: impl Into<String>,
    ) -> Self {
        RecordError::Conflict {
            code,
            message: message.into(),
            existing_id: existing_id.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RecordError::NotFound(_) => "not_found",
            RecordError::Validation { .. } => "bad_params",
            RecordError::Conflict { code, .. } => code,
            RecordError::Database(_) => "db_query_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            RecordError::Validation { details, .. } => details.clone(),
            RecordError::Conflict { existing_id, .. } => Some(json!({ "existingId": existing_id })),
            _ => None,
        }
    }
}
