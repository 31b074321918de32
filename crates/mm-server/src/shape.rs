//! Shaping of cached metadata into wire summaries.
//!
//! Stored defaults, bounds, and attribute values are strings. Clients get
//! them typed: booleans as JSON booleans, numeric types as numbers, and
//! everything else as strings. A value that does not parse as its declared
//! type is passed through as a string.

use serde_json::{Number, Value};

use mm_protocol::ops::CachedArgumentInfo;
use mm_protocol::{ArgumentSummary, AttributeSummary, MeasureSummary, OutputSummary};

use crate::cache::ArgumentKey;
use crate::measure::{ArgumentDecl, ArgumentInfo, ArgumentType, Attribute, AttributeType, MeasureMetadata, OutputDecl};

/// Summary of `measure`, with arguments from `info` when given.
///
/// Without `info` the arguments declared in the metadata are used. A failed
/// `info` yields no arguments and carries its error.
pub fn measure_summary(measure: &MeasureMetadata, info: Option<&ArgumentInfo>) -> MeasureSummary {
    let (arguments, outputs, error) = match info {
        Some(info) if info.is_failure() => (&[][..], &measure.outputs[..], info.error.clone()),
        Some(info) => (&info.arguments[..], &info.outputs[..], None),
        None => (&measure.arguments[..], &measure.outputs[..], None),
    };

    MeasureSummary {
        measure_dir: measure.directory.to_string_lossy().to_string(),
        name: measure.name.clone(),
        directory: measure
            .directory
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        uid: measure.uid.clone(),
        uuid: measure.uid.clone(),
        version_id: measure.version_id.clone(),
        version_modified: measure.version_modified.clone(),
        xml_checksum: measure.xml_checksum.clone(),
        display_name: measure.display_name.clone(),
        class_name: measure.class_name.clone(),
        description: measure.description.clone(),
        modeler_description: measure.modeler_description.clone(),
        tags: measure.tags.clone(),
        outputs: outputs.iter().map(output_summary).collect(),
        attributes: measure.attributes.iter().map(attribute_summary).collect(),
        arguments: arguments.iter().map(argument_summary).collect(),
        error,
    }
}

/// One argument-info row as reported by internal_state.
pub fn cached_argument_info(key: &ArgumentKey, info: &ArgumentInfo) -> CachedArgumentInfo {
    CachedArgumentInfo {
        measure_dir: key.measure_dir.to_string_lossy().to_string(),
        osm_path: key
            .model_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default(),
        arguments: info.arguments.iter().map(argument_summary).collect(),
        outputs: info.outputs.iter().map(output_summary).collect(),
        error: info.error.clone(),
    }
}

pub fn argument_summary(arg: &ArgumentDecl) -> ArgumentSummary {
    let typed = |raw: &Option<String>| raw.as_deref().map(|v| typed_value(arg.type_, v));
    let (min_value, max_value) = if arg.type_.is_numeric() {
        (typed(&arg.min_value), typed(&arg.max_value))
    } else {
        (None, None)
    };

    ArgumentSummary {
        name: arg.name.clone(),
        display_name: arg.display_name.clone(),
        description: arg.description.clone(),
        type_: arg.type_.as_str().to_string(),
        units: arg.units.clone(),
        required: arg.required,
        model_dependent: arg.model_dependent,
        default_value: typed(&arg.default_value),
        min_value,
        max_value,
        choice_values: arg.choices.iter().map(|c| c.value.clone()).collect(),
        choice_display_names: arg.choices.iter().map(|c| c.display_name.clone()).collect(),
    }
}

pub fn output_summary(output: &OutputDecl) -> OutputSummary {
    OutputSummary {
        name: output.name.clone(),
        display_name: output.display_name.clone(),
        short_name: output.short_name.clone(),
        description: output.description.clone(),
        type_: output.type_.clone(),
        units: output.units.clone(),
        model_dependent: output.model_dependent,
    }
}

pub fn attribute_summary(attr: &Attribute) -> AttributeSummary {
    let type_ = match attr.datatype {
        AttributeType::Boolean => ArgumentType::Boolean,
        AttributeType::Double => ArgumentType::Double,
        AttributeType::Integer => ArgumentType::Integer,
        AttributeType::String => ArgumentType::String,
    };
    AttributeSummary {
        name: attr.name.clone(),
        display_name: attr.display_name.clone().unwrap_or_else(|| attr.name.clone()),
        value: typed_value(type_, &attr.value),
    }
}

/// Convert a stored string to JSON according to `type_`.
pub fn typed_value(type_: ArgumentType, raw: &str) -> Value {
    let trimmed = raw.trim();
    let typed = match type_ {
        ArgumentType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        ArgumentType::Integer => trimmed.parse::<i64>().ok().map(Value::from),
        ArgumentType::Double | ArgumentType::Quantity => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        ArgumentType::String | ArgumentType::Choice | ArgumentType::Path => None,
    };
    typed.unwrap_or_else(|| Value::String(raw.to_string()))
}
