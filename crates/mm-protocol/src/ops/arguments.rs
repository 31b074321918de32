//! compute_arguments operation types.

use serde::{Deserialize, Serialize};

/// compute_arguments request payload.
///
/// The response is a single [`MeasureSummary`](crate::MeasureSummary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeArgumentsRequest {
    /// Measure directory.
    #[serde(alias = "measure_path")]
    pub measure_dir: String,
    /// Model giving the arguments their context, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub osm_path: Option<String>,
}

impl ComputeArgumentsRequest {
    /// The model path, treating an empty string as "no model".
    pub fn model_path(&self) -> Option<&str> {
        self.osm_path.as_deref().filter(|p| !p.trim().is_empty())
    }
}
