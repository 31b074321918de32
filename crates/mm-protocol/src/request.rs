//! Request types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// Request envelope.
///
/// Over HTTP the operation name comes from the request path and the payload is
/// the body; the one-shot RPC mode reads the whole envelope from stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Operation name.
    pub op: String,
    /// Operation-specific payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RpcRequest {
    /// Create a request for `op` with the given payload.
    pub fn new(op: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            op: op.into(),
            payload,
        }
    }

    /// Decode the payload into an operation-specific request type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, RpcError> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            RpcError::invalid_request(format!("invalid {} request: {}", self.op, e))
        })
    }
}
