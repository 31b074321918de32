//! Response types.

use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, RpcError};

/// Error body returned in place of a result.
///
/// The `error`/`backtrace` pair is what existing clients read; `code` is the
/// stable machine-readable classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Human-readable error message.
    pub error: String,
    /// Cause chain rendered as a JSON array string.
    pub backtrace: String,
    /// Stable error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

/// Response body.
///
/// Successful operations return their payload as the whole body; failures
/// return an [`ErrorEnvelope`]. The transport always answers with status 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcResponse {
    /// Failure envelope.
    Error(ErrorEnvelope),
    /// Operation payload.
    Success(serde_json::Value),
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(payload: serde_json::Value) -> Self {
        Self::Success(payload)
    }

    /// Create an error response.
    pub fn error(error: RpcError) -> Self {
        let backtrace =
            serde_json::to_string(&error.trace).unwrap_or_else(|_| String::from("[]"));
        Self::Error(ErrorEnvelope {
            error: error.message,
            backtrace,
            code: Some(error.code),
        })
    }

    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The error envelope, if this is a failure.
    pub fn as_error(&self) -> Option<&ErrorEnvelope> {
        match self {
            Self::Error(envelope) => Some(envelope),
            Self::Success(_) => None,
        }
    }

    /// The payload, if this is a success.
    pub fn payload(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let err = RpcError::already_exists("/m").with_trace(vec!["outer".into(), "inner".into()]);
        let body = serde_json::to_value(RpcResponse::error(err)).unwrap();

        assert_eq!(body["error"], "a measure already exists at '/m'");
        assert_eq!(body["backtrace"], r#"["outer","inner"]"#);
        assert_eq!(body["code"], "ALREADY_EXISTS");
    }

    #[test]
    fn test_success_body_is_bare_payload() {
        let body = serde_json::to_string(&RpcResponse::success(serde_json::json!({ "result": true }))).unwrap();
        assert_eq!(body, r#"{"result":true}"#);
    }

    #[test]
    fn test_summary_with_error_field_parses_as_success() {
        // A summary carrying a script error has no backtrace, so it is not an envelope.
        let parsed: RpcResponse =
            serde_json::from_str(r#"{"name":"m","error":"boom","arguments":[]}"#).unwrap();
        assert!(parsed.is_ok());

        let parsed: RpcResponse =
            serde_json::from_str(r#"{"error":"boom","backtrace":"[]"}"#).unwrap();
        assert_eq!(parsed.as_error().unwrap().error, "boom");
        assert_eq!(parsed.as_error().unwrap().code, None);
    }
}
