//! Measure metadata and declared argument information.
//!
//! These mirror the contents of a measure's `measure.xml`. Argument defaults
//! and bounds stay in their stored string form here; `shape` converts them to
//! typed JSON for clients.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// Name of the metadata file inside a measure directory.
pub const MEASURE_XML: &str = "measure.xml";

/// Name of the measure script inside a measure directory.
pub const MEASURE_SCRIPT: &str = "measure.rb";

/// Attribute holding the measure type.
pub const MEASURE_TYPE_ATTRIBUTE: &str = "Measure Type";

/// Type tag of a measure argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentType {
    Boolean,
    Double,
    Quantity,
    Integer,
    String,
    Choice,
    Path,
}

impl ArgumentType {
    /// Parse a type tag, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Some(Self::Boolean),
            "double" => Some(Self::Double),
            "quantity" => Some(Self::Quantity),
            "integer" | "int" => Some(Self::Integer),
            "string" => Some(Self::String),
            "choice" => Some(Self::Choice),
            "path" => Some(Self::Path),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Double => "Double",
            Self::Quantity => "Quantity",
            Self::Integer => "Integer",
            Self::String => "String",
            Self::Choice => "Choice",
            Self::Path => "Path",
        }
    }

    /// Whether min/max bounds apply.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Double | Self::Quantity | Self::Integer)
    }
}

/// One allowed value of a choice argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub display_name: String,
}

/// An argument declared by a measure script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDecl {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_: ArgumentType,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub model_dependent: bool,
    #[serde(default, deserialize_with = "scalar_string")]
    pub default_value: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub min_value: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub max_value: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl ArgumentDecl {
    /// A required argument with no default and no extras.
    pub fn new(name: &str, display_name: &str, type_: ArgumentType) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: None,
            type_,
            units: None,
            required: true,
            model_dependent: false,
            default_value: None,
            min_value: None,
            max_value: None,
            choices: Vec::new(),
        }
    }

    /// Bring extracted values into the form they take after an XML round
    /// trip: characters XML cannot carry are dropped and empty optional
    /// strings become `None`.
    fn normalize(&mut self) {
        strip_non_xml(&mut self.name);
        strip_non_xml(&mut self.display_name);
        for choice in &mut self.choices {
            strip_non_xml(&mut choice.value);
            strip_non_xml(&mut choice.display_name);
        }
        for field in [
            &mut self.description,
            &mut self.units,
            &mut self.default_value,
            &mut self.min_value,
            &mut self.max_value,
        ] {
            normalize_optional(field);
        }
    }
}

/// An output declared by a measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDecl {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub model_dependent: bool,
}

impl OutputDecl {
    fn normalize(&mut self) {
        strip_non_xml(&mut self.name);
        strip_non_xml(&mut self.display_name);
        strip_non_xml(&mut self.type_);
        for field in [&mut self.short_name, &mut self.description, &mut self.units] {
            normalize_optional(field);
        }
    }
}

/// Whether `c` may appear in an XML 1.0 document.
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn strip_non_xml(value: &mut String) {
    if !value.chars().all(is_xml_char) {
        value.retain(is_xml_char);
    }
}

fn normalize_optional(field: &mut Option<String>) {
    if let Some(value) = field.as_mut() {
        strip_non_xml(value);
    }
    if field.as_deref().is_some_and(str::is_empty) {
        *field = None;
    }
}

/// Datatype of a measure attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Boolean,
    Double,
    Integer,
    String,
}

impl AttributeType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" => Some(Self::Boolean),
            "double" | "float" => Some(Self::Double),
            "integer" | "unsigned" => Some(Self::Integer),
            "string" => Some(Self::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Double => "double",
            Self::Integer => "integer",
            Self::String => "string",
        }
    }
}

/// A measure attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub value: String,
    pub datatype: AttributeType,
}

impl Attribute {
    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            value: value.to_string(),
            datatype: AttributeType::String,
        }
    }

    pub fn boolean(name: &str, value: bool) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            value: value.to_string(),
            datatype: AttributeType::Boolean,
        }
    }
}

/// A file recorded in the measure's manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureFile {
    /// Path relative to the measure directory, `/`-separated.
    pub filename: String,
    pub filetype: String,
    pub usage_type: String,
    pub checksum: String,
}

/// Argument and output declarations computed by running a measure script.
///
/// A failed computation is represented by a placeholder whose only populated
/// field is `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentInfo {
    #[serde(default)]
    pub arguments: Vec<ArgumentDecl>,
    #[serde(default)]
    pub outputs: Vec<OutputDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ArgumentInfo {
    /// Placeholder for a script that raised.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            arguments: Vec::new(),
            outputs: Vec::new(),
            error: Some(message.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Parameters for creating a new measure (or a renamed copy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureTemplate {
    pub display_name: String,
    pub class_name: String,
    pub taxonomy_tag: String,
    pub measure_type: String,
    pub description: String,
    pub modeler_description: String,
}

/// Metadata of one measure, as stored in `measure.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureMetadata {
    /// Directory the measure was loaded from.
    #[serde(skip)]
    pub directory: PathBuf,
    pub schema_version: String,
    pub name: String,
    pub uid: String,
    pub version_id: String,
    pub version_modified: Option<String>,
    pub xml_checksum: String,
    pub class_name: String,
    pub display_name: String,
    pub description: String,
    pub modeler_description: String,
    pub arguments: Vec<ArgumentDecl>,
    pub outputs: Vec<OutputDecl>,
    pub tags: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub files: Vec<MeasureFile>,
}

/// The fields covered by the xml checksum.
#[derive(Serialize)]
struct ChecksumView<'a> {
    name: &'a str,
    class_name: &'a str,
    display_name: &'a str,
    description: &'a str,
    modeler_description: &'a str,
    arguments: &'a [ArgumentDecl],
    outputs: &'a [OutputDecl],
    tags: &'a [String],
    attributes: &'a [Attribute],
}

impl MeasureMetadata {
    /// Value of the "Measure Type" attribute.
    pub fn measure_type(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == MEASURE_TYPE_ATTRIBUTE)
            .map(|a| a.value.as_str())
    }

    /// Checksum of the user-visible metadata.
    ///
    /// SHA-256 over the RFC 8785 canonical JSON of the checksummed fields, so
    /// it does not depend on XML formatting.
    pub fn compute_xml_checksum(&self) -> String {
        let view = ChecksumView {
            name: &self.name,
            class_name: &self.class_name,
            display_name: &self.display_name,
            description: &self.description,
            modeler_description: &self.modeler_description,
            arguments: &self.arguments,
            outputs: &self.outputs,
            tags: &self.tags,
            attributes: &self.attributes,
        };
        let bytes = serde_json_canonicalizer::to_vec(&view).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    }

    /// Replace declared arguments and outputs with freshly extracted ones.
    ///
    /// A failure placeholder leaves the metadata untouched.
    pub fn apply_argument_info(&mut self, info: &ArgumentInfo) {
        if info.is_failure() {
            return;
        }
        self.arguments = info.arguments.clone();
        self.arguments.iter_mut().for_each(ArgumentDecl::normalize);
        self.outputs = info.outputs.clone();
        self.outputs.iter_mut().for_each(OutputDecl::normalize);
    }

    /// Assign a new version id and modification stamp.
    pub fn bump_version(&mut self) {
        self.version_id = uuid::Uuid::new_v4().to_string();
        self.version_modified = Some(chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
    }
}

/// Lower snake-case form of a display name, used as the measure `name`.
pub fn snake_case(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    let mut prev_lower = false;
    for c in display_name.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && prev_lower && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower = false;
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Accept a JSON string, number, or boolean as its string form.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a scalar, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MeasureMetadata {
        MeasureMetadata {
            directory: PathBuf::from("/measures/a"),
            schema_version: "3.0".into(),
            name: "set_lights".into(),
            uid: "uid-1".into(),
            version_id: "v-1".into(),
            version_modified: None,
            xml_checksum: String::new(),
            class_name: "SetLights".into(),
            display_name: "Set Lights".into(),
            description: "d".into(),
            modeler_description: "md".into(),
            arguments: vec![ArgumentDecl::new("lpd", "LPD", ArgumentType::Double)],
            outputs: Vec::new(),
            tags: vec!["Electric Lighting.Lighting Equipment".into()],
            attributes: vec![Attribute::string(MEASURE_TYPE_ATTRIBUTE, "ModelMeasure")],
            files: Vec::new(),
        }
    }

    #[test]
    fn test_xml_checksum_ignores_version_fields() {
        let a = sample();
        let mut b = sample();
        b.bump_version();
        b.files.push(MeasureFile {
            filename: "measure.rb".into(),
            filetype: "rb".into(),
            usage_type: "script".into(),
            checksum: "abc".into(),
        });
        assert_eq!(a.compute_xml_checksum(), b.compute_xml_checksum());
    }

    #[test]
    fn test_xml_checksum_tracks_arguments() {
        let a = sample();
        let mut b = sample();
        b.arguments[0].default_value = Some("10.0".into());
        assert_ne!(a.compute_xml_checksum(), b.compute_xml_checksum());
    }

    #[test]
    fn test_apply_argument_info_skips_failures() {
        let mut m = sample();
        m.apply_argument_info(&ArgumentInfo::failed("boom"));
        assert_eq!(m.arguments.len(), 1);

        let mut arg = ArgumentDecl::new("flag", "Flag", ArgumentType::Boolean);
        arg.units = Some(String::new());
        m.apply_argument_info(&ArgumentInfo {
            arguments: vec![arg],
            ..ArgumentInfo::default()
        });
        assert_eq!(m.arguments[0].name, "flag");
        assert_eq!(m.arguments[0].units, None);
    }

    #[test]
    fn test_apply_argument_info_normalizes_outputs() {
        let mut m = sample();
        m.apply_argument_info(&ArgumentInfo {
            outputs: vec![OutputDecl {
                name: "eui".into(),
                display_name: "EUI\u{7}".into(),
                short_name: Some(String::new()),
                description: Some(String::new()),
                type_: "Double".into(),
                units: Some("\u{1b}".into()),
                model_dependent: false,
            }],
            ..ArgumentInfo::default()
        });

        let output = &m.outputs[0];
        assert_eq!(output.display_name, "EUI");
        assert_eq!(output.short_name, None);
        assert_eq!(output.description, None);
        assert_eq!(output.units, None);
    }

    #[test]
    fn test_apply_argument_info_strips_non_xml_chars() {
        let mut m = sample();
        let mut arg = ArgumentDecl::new("zone", "Zone\u{0}", ArgumentType::Choice);
        arg.choices.push(Choice {
            value: "a\u{8}".into(),
            display_name: "A\tone".into(),
        });
        m.apply_argument_info(&ArgumentInfo {
            arguments: vec![arg],
            ..ArgumentInfo::default()
        });

        assert_eq!(m.arguments[0].display_name, "Zone");
        assert_eq!(m.arguments[0].choices[0].value, "a");
        assert_eq!(m.arguments[0].choices[0].display_name, "A\tone");
    }

    #[test]
    fn test_is_xml_char() {
        assert!(is_xml_char('a'));
        assert!(is_xml_char('\n'));
        assert!(is_xml_char('\u{1F600}'));
        assert!(!is_xml_char('\u{7}'));
        assert!(!is_xml_char('\u{FFFE}'));
    }

    #[test]
    fn test_argument_decl_accepts_typed_defaults() {
        let decl: ArgumentDecl = serde_json::from_value(serde_json::json!({
            "name": "flag",
            "type": "Boolean",
            "default_value": true,
            "max_value": 3,
        }))
        .unwrap();
        assert_eq!(decl.default_value.as_deref(), Some("true"));
        assert_eq!(decl.max_value.as_deref(), Some("3"));
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("New Measure"), "new_measure");
        assert_eq!(snake_case("Set Window-to-Wall Ratio"), "set_window_to_wall_ratio");
        assert_eq!(snake_case("AddHVAC2 System"), "add_hvac2_system");
    }

    #[test]
    fn test_argument_type_parse() {
        assert_eq!(ArgumentType::parse("boolean"), Some(ArgumentType::Boolean));
        assert_eq!(ArgumentType::parse("Choice"), Some(ArgumentType::Choice));
        assert_eq!(ArgumentType::parse("blob"), None);
        assert!(ArgumentType::Integer.is_numeric());
    }
}
