//! Operation handlers.
//!
//! Each operation has its own handler module. A handler decodes its payload,
//! drives the coordinator, and returns the JSON result payload.

pub mod compute_arguments;
pub mod create_measure;
pub mod duplicate_measure;
pub mod internal_state;
pub mod load_osm;
pub mod update_measures;

use std::path::PathBuf;

use mm_protocol::RpcError;
use serde::Serialize;

use crate::measure::{is_xml_char, MeasureTemplate};

/// Measure types a new measure may declare.
pub const MEASURE_TYPES: &[&str] = &[
    "ModelMeasure",
    "EnergyPlusMeasure",
    "ReportingMeasure",
    "UtilityMeasure",
];

/// Serialize a handler result.
pub(crate) fn to_payload<T: Serialize>(value: &T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|e| RpcError::internal(format!("failed to serialize response: {}", e)))
}

/// A non-empty path field.
pub(crate) fn required_path(field: &str, value: &str) -> Result<PathBuf, RpcError> {
    if value.trim().is_empty() {
        return Err(RpcError::invalid_request(format!("{} must not be empty", field)));
    }
    Ok(PathBuf::from(value))
}

/// Validate the naming fields shared by create and duplicate.
pub(crate) fn measure_template(
    name: &str,
    class_name: &str,
    taxonomy_tag: &str,
    measure_type: &str,
    description: &str,
    modeler_description: &str,
) -> Result<MeasureTemplate, RpcError> {
    if name.trim().is_empty() {
        return Err(RpcError::invalid_request("name must not be empty"));
    }
    let mut chars = class_name.chars();
    let valid_class = chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid_class {
        return Err(RpcError::invalid_request(format!(
            "class_name '{}' is not a valid class name",
            class_name
        )));
    }
    for (field, value) in [
        ("name", name),
        ("taxonomy_tag", taxonomy_tag),
        ("description", description),
        ("modeler_description", modeler_description),
    ] {
        if let Some(c) = value.chars().find(|c| !is_xml_char(*c)) {
            return Err(RpcError::invalid_request(format!(
                "{} contains a character that cannot be stored: {:?}",
                field, c
            )));
        }
    }
    if !MEASURE_TYPES.contains(&measure_type) {
        return Err(RpcError::invalid_request(format!(
            "unknown measure_type '{}', expected one of {}",
            measure_type,
            MEASURE_TYPES.join(", ")
        )));
    }

    Ok(MeasureTemplate {
        display_name: name.to_string(),
        class_name: class_name.to_string(),
        taxonomy_tag: taxonomy_tag.to_string(),
        measure_type: measure_type.to_string(),
        description: description.to_string(),
        modeler_description: modeler_description.to_string(),
    })
}
