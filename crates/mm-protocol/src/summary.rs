//! Measure summary DTOs.
//!
//! A summary is the measure's metadata, its attributes, and its arguments
//! shaped for JSON clients: default values and bounds carry their native JSON
//! type rather than the string form stored in `measure.xml`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a client needs to display and configure one measure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasureSummary {
    /// Absolute measure directory.
    pub measure_dir: String,
    pub name: String,
    /// Final path component of the measure directory.
    pub directory: String,
    pub uid: String,
    /// Alias of `uid`, kept for older clients.
    pub uuid: String,
    pub version_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_modified: Option<String>,
    pub xml_checksum: String,
    pub display_name: String,
    pub class_name: String,
    pub description: String,
    pub modeler_description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<OutputSummary>,
    #[serde(default)]
    pub attributes: Vec<AttributeSummary>,
    #[serde(default)]
    pub arguments: Vec<ArgumentSummary>,
    /// Set when the measure script failed while declaring its arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One declared measure argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSummary {
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Type tag: Boolean, Double, Integer, String, Choice or Path.
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    pub required: bool,
    pub model_dependent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choice_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choice_display_names: Vec<String>,
}

/// One declared measure output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSummary {
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    pub model_dependent: bool,
}

/// A measure attribute with its value in native JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSummary {
    pub name: String,
    pub display_name: String,
    pub value: Value,
}
