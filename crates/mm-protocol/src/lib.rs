//! Measure Manager Protocol Types
//!
//! Defines the JSON request/response envelope spoken between the design tool
//! and the measure manager service, plus the per-operation payloads.

pub mod error;
pub mod request;
pub mod response;
pub mod ops;
pub mod summary;

pub use error::{ErrorCode, RpcError};
pub use request::RpcRequest;
pub use response::{ErrorEnvelope, RpcResponse};
pub use summary::{ArgumentSummary, AttributeSummary, MeasureSummary, OutputSummary};

/// Default TCP port the service listens on.
pub const DEFAULT_PORT: u16 = 1234;

/// Current service version string.
pub const SERVICE_VERSION: &str = "0.1.0";
