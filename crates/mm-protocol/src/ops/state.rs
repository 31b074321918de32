//! internal_state operation types.
//!
//! Diagnostic dump of the three caches.

use serde::{Deserialize, Serialize};

use crate::summary::{ArgumentSummary, MeasureSummary, OutputSummary};

/// A cached model as reported by internal_state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedModel {
    pub osm_path: String,
    /// Fingerprint the model was loaded under.
    pub checksum: String,
}

/// A cached argument-info row as reported by internal_state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedArgumentInfo {
    pub measure_dir: String,
    /// Empty when the arguments were computed without a model.
    pub osm_path: String,
    #[serde(default)]
    pub arguments: Vec<ArgumentSummary>,
    #[serde(default)]
    pub outputs: Vec<OutputSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// internal_state response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InternalStateResponse {
    pub osms: Vec<CachedModel>,
    pub measures: Vec<MeasureSummary>,
    pub measure_info: Vec<CachedArgumentInfo>,
}
