//! update_measures operation types.
//!
//! Lists every measure under a directory, refreshing stale metadata on the way.

use serde::{Deserialize, Serialize};

/// update_measures request payload.
///
/// The response is an array of [`MeasureSummary`](crate::MeasureSummary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMeasuresRequest {
    /// Directory whose immediate subdirectories are measures.
    pub measures_dir: String,
}
