//! Error types for the wire protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes returned inside error envelopes.
///
/// These codes are stable and used for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed JSON, missing required fields, or invalid field values.
    InvalidRequest,
    /// Unknown operation requested.
    UnknownOperation,
    /// The measure directory is absent or has no loadable metadata.
    MeasureNotFound,
    /// The model file is absent or cannot be loaded.
    ModelNotFound,
    /// A create/duplicate target already holds a measure.
    AlreadyExists,
    /// Refreshing stale measure metadata failed.
    LoadFailure,
    /// Any other unexpected failure.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::UnknownOperation => write!(f, "UNKNOWN_OPERATION"),
            Self::MeasureNotFound => write!(f, "MEASURE_NOT_FOUND"),
            Self::ModelNotFound => write!(f, "MODEL_NOT_FOUND"),
            Self::AlreadyExists => write!(f, "ALREADY_EXISTS"),
            Self::LoadFailure => write!(f, "LOAD_FAILURE"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Error produced by an operation handler.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RpcError {
    /// Error code from the registry.
    pub code: ErrorCode,
    /// Human-readable, single-line error message.
    pub message: String,
    /// Cause chain, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
    /// Optional machine-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new RPC error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            trace: Vec::new(),
            data: None,
        }
    }

    /// Create a new RPC error with additional data.
    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::new(code, message)
        }
    }

    /// Attach the cause chain of an underlying error.
    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }

    /// Create an INVALID_REQUEST error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Create an UNKNOWN_OPERATION error.
    pub fn unknown_operation(op: &str) -> Self {
        Self::with_data(
            ErrorCode::UnknownOperation,
            format!("unknown operation: {}", op),
            serde_json::json!({ "op": op }),
        )
    }

    /// Create a MEASURE_NOT_FOUND error.
    pub fn measure_not_found(measure_dir: &str) -> Self {
        Self::with_data(
            ErrorCode::MeasureNotFound,
            format!("cannot load measure at '{}'", measure_dir),
            serde_json::json!({ "measure_dir": measure_dir }),
        )
    }

    /// Create a MODEL_NOT_FOUND error.
    pub fn model_not_found(osm_path: &str) -> Self {
        Self::with_data(
            ErrorCode::ModelNotFound,
            format!("cannot load model at '{}'", osm_path),
            serde_json::json!({ "osm_path": osm_path }),
        )
    }

    /// Create an ALREADY_EXISTS error.
    pub fn already_exists(measure_dir: &str) -> Self {
        Self::with_data(
            ErrorCode::AlreadyExists,
            format!("a measure already exists at '{}'", measure_dir),
            serde_json::json!({ "measure_dir": measure_dir }),
        )
    }

    /// Create a LOAD_FAILURE error.
    pub fn load_failure(measure_dir: &str, reason: &str) -> Self {
        Self::with_data(
            ErrorCode::LoadFailure,
            format!("failed to update measure at '{}': {}", measure_dir, reason),
            serde_json::json!({ "measure_dir": measure_dir }),
        )
    }

    /// Create an INTERNAL error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::MeasureNotFound).unwrap();
        assert_eq!(json, "\"MEASURE_NOT_FOUND\"");
        assert_eq!(ErrorCode::AlreadyExists.to_string(), "ALREADY_EXISTS");
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err = RpcError::model_not_found("/tmp/x.osm");
        assert_eq!(err.to_string(), "MODEL_NOT_FOUND: cannot load model at '/tmp/x.osm'");
        assert_eq!(err.data.unwrap()["osm_path"], "/tmp/x.osm");
    }
}
