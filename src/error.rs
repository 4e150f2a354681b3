use serde_json::json;
use thiserror::Error;

/// Failures of the succession engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{message}")]
    Conflict {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Lock contention or an exceeded transaction budget. Safe to retry.
    #[error("storage temporarily unavailable: {0}")]
    TransientStorage(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            details: None,
        }
    }

    pub fn conflict_with(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Conflict {
            message: message.into(),
            details: Some(details),
        }
    }

    /// IPC error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::InvalidState(_) => "invalid_state",
            Self::Validation(_) => "validation_failed",
            Self::TransientStorage(_) => "service_unavailable",
            Self::Storage(_) => "db_query_failed",
            Self::Serialization(_) => "serialization_failed",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStorage(_))
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            Self::Conflict { details, .. } => details.clone(),
            Self::TransientStorage(_) => Some(json!({ "retryable": true })),
            _ => None,
        }
    }

    /// Busy/locked SQLite errors become retryable instead of terminal.
    pub fn from_storage(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                Self::TransientStorage(e.to_string())
            }
            _ => Self::Storage(e),
        }
    }
}

/// One failed record inside a batch run. Batch operations collect these
/// next to their success counts instead of aborting.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordError {
    pub record_id: Option<String>,
    pub position_number: Option<String>,
    pub code: String,
    pub message: String,
}

impl RecordError {
    pub fn from_engine(
        record_id: Option<String>,
        position_number: Option<String>,
        e: &EngineError,
    ) -> Self {
        Self {
            record_id,
            position_number,
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_retryability() {
        assert_eq!(EngineError::not_found("applicant", "A1").code(), "not_found");
        assert_eq!(EngineError::conflict("taken").code(), "conflict");
        assert!(EngineError::TransientStorage("busy".into()).is_retryable());
        assert!(!EngineError::InvalidState("x".into()).is_retryable());
        assert_eq!(
            EngineError::TransientStorage("busy".into()).details(),
            Some(json!({ "retryable": true }))
        );
    }

    #[test]
    fn busy_maps_to_transient() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(EngineError::from_storage(busy).is_retryable());
        let other = rusqlite::Error::QueryReturnedNoRows;
        assert!(matches!(EngineError::from_storage(other), EngineError::Storage(_)));
    }
}
