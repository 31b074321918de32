//! create_measure and duplicate_measure operation types.

use serde::{Deserialize, Serialize};

/// create_measure request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMeasureRequest {
    /// Directory to create the measure in.
    #[serde(alias = "measure_path")]
    pub measure_dir: String,
    /// Human-readable measure name.
    pub name: String,
    /// Class name declared by the measure script.
    pub class_name: String,
    /// Taxonomy tag, e.g. `Envelope.Form`.
    pub taxonomy_tag: String,
    /// Measure type, e.g. `ModelMeasure`.
    pub measure_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub modeler_description: String,
}

/// duplicate_measure request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMeasureRequest {
    /// Measure to copy.
    #[serde(alias = "old_measure_path")]
    pub old_measure_dir: String,
    /// Directory to create the copy in.
    #[serde(alias = "measure_path")]
    pub measure_dir: String,
    pub name: String,
    pub class_name: String,
    pub taxonomy_tag: String,
    pub measure_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub modeler_description: String,
}
