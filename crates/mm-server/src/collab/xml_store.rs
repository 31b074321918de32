//! `measure.xml` backed measure store.
//!
//! File checksums are SHA-256 digests of file contents. The xml checksum is
//! [`MeasureMetadata::compute_xml_checksum`], so a hand edit to the declared
//! metadata that does not also update `<xml_checksum>` is detected as drift.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::LoadError;
use crate::fingerprint::{is_hidden, Fingerprint};
use crate::measure::{
    is_xml_char, snake_case, ArgumentDecl, ArgumentType, Attribute, AttributeType, Choice,
    MeasureFile, MeasureMetadata, MeasureTemplate, OutputDecl, MEASURE_SCRIPT,
    MEASURE_TYPE_ATTRIBUTE, MEASURE_XML,
};

use super::MeasureStore;

/// Schema version written to new metadata files.
const SCHEMA_VERSION: &str = "3.0";

/// Measure store reading and writing `measure.xml` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlMeasureStore;

impl MeasureStore for XmlMeasureStore {
    fn load(&self, dir: &Path) -> Result<MeasureMetadata, LoadError> {
        let path = dir.join(MEASURE_XML);
        if !path.is_file() {
            return Err(LoadError::Missing(path));
        }
        let contents = fs::read_to_string(&path).map_err(LoadError::io(&path))?;
        let mut measure = parse_measure_xml(&path, &contents)?;
        measure.directory = dir.to_path_buf();
        Ok(measure)
    }

    fn save(&self, measure: &mut MeasureMetadata) -> Result<(), LoadError> {
        let dir = measure.directory.clone();
        fs::create_dir_all(&dir).map_err(LoadError::io(&dir))?;

        let files = scan_files(&dir).map_err(LoadError::io(&dir))?;
        let checksum = measure.compute_xml_checksum();
        if files != measure.files || checksum != measure.xml_checksum {
            measure.bump_version();
        }
        measure.files = files;
        measure.xml_checksum = checksum;

        let path = dir.join(MEASURE_XML);
        write_atomic(&path, &render_measure_xml(measure)).map_err(LoadError::io(&path))?;
        debug!(measure_dir = %dir.display(), version_id = %measure.version_id, "saved measure metadata");
        Ok(())
    }

    fn create(&self, dir: &Path, template: &MeasureTemplate) -> Result<MeasureMetadata, LoadError> {
        if dir.join(MEASURE_XML).exists() || dir.join(MEASURE_SCRIPT).exists() {
            return Err(LoadError::AlreadyExists(dir.to_path_buf()));
        }
        fs::create_dir_all(dir).map_err(LoadError::io(dir))?;

        let script_path = dir.join(MEASURE_SCRIPT);
        fs::write(&script_path, render_script(template)).map_err(LoadError::io(&script_path))?;
        let readme_path = dir.join("README.md");
        let readme = format!(
            "# {}\n\n## Description\n{}\n\n## Modeler Description\n{}\n",
            template.display_name, template.description, template.modeler_description
        );
        fs::write(&readme_path, readme).map_err(LoadError::io(&readme_path))?;

        let mut measure = MeasureMetadata {
            directory: dir.to_path_buf(),
            schema_version: SCHEMA_VERSION.to_string(),
            name: snake_case(&template.display_name),
            uid: uuid::Uuid::new_v4().to_string(),
            version_id: String::new(),
            version_modified: None,
            xml_checksum: String::new(),
            class_name: template.class_name.clone(),
            display_name: template.display_name.clone(),
            description: template.description.clone(),
            modeler_description: template.modeler_description.clone(),
            arguments: template_arguments(&template.measure_type),
            outputs: Vec::new(),
            tags: vec![template.taxonomy_tag.clone()],
            attributes: template_attributes(&template.measure_type),
            files: Vec::new(),
        };
        self.save(&mut measure)?;
        info!(measure_dir = %dir.display(), class_name = %measure.class_name, "created measure");
        Ok(measure)
    }

    fn duplicate(
        &self,
        source: &MeasureMetadata,
        dir: &Path,
        template: &MeasureTemplate,
    ) -> Result<MeasureMetadata, LoadError> {
        if dir.join(MEASURE_XML).exists() {
            return Err(LoadError::AlreadyExists(dir.to_path_buf()));
        }
        copy_measure_tree(&source.directory, dir, source, template)?;

        let mut measure = source.clone();
        measure.directory = dir.to_path_buf();
        measure.name = snake_case(&template.display_name);
        measure.uid = uuid::Uuid::new_v4().to_string();
        measure.class_name = template.class_name.clone();
        measure.display_name = template.display_name.clone();
        measure.description = template.description.clone();
        measure.modeler_description = template.modeler_description.clone();
        measure.tags = vec![template.taxonomy_tag.clone()];
        measure.attributes.retain(|a| a.name != MEASURE_TYPE_ATTRIBUTE);
        measure
            .attributes
            .insert(0, Attribute::string(MEASURE_TYPE_ATTRIBUTE, &template.measure_type));
        measure.bump_version();
        self.save(&mut measure)?;
        info!(
            from = %source.directory.display(),
            measure_dir = %dir.display(),
            class_name = %measure.class_name,
            "duplicated measure"
        );
        Ok(measure)
    }

    fn files_changed(&self, measure: &MeasureMetadata) -> bool {
        let current = match scan_files(&measure.directory) {
            Ok(files) => files,
            Err(_) => return true,
        };
        let recorded: BTreeMap<_, _> = measure
            .files
            .iter()
            .map(|f| (f.filename.as_str(), f.checksum.as_str()))
            .collect();
        let current: BTreeMap<_, _> = current
            .iter()
            .map(|f| (f.filename.as_str(), f.checksum.as_str()))
            .collect();
        recorded != current
    }

    fn xml_changed(&self, measure: &MeasureMetadata) -> bool {
        let on_disk = match self.load(&measure.directory) {
            Ok(m) => m,
            Err(_) => return true,
        };
        let disk_checksum = on_disk.compute_xml_checksum();
        disk_checksum != on_disk.xml_checksum || disk_checksum != measure.compute_xml_checksum()
    }
}

/// Every non-hidden file under `dir` except the metadata file, sorted by path.
fn scan_files(dir: &Path) -> io::Result<Vec<MeasureFile>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = match entry.path().strip_prefix(dir) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let filename = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if filename == MEASURE_XML {
            continue;
        }

        files.push(MeasureFile {
            filetype: rel
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default(),
            usage_type: usage_type(&filename).to_string(),
            checksum: Fingerprint::from_file(entry.path())?.to_string(),
            filename,
        });
    }
    Ok(files)
}

fn usage_type(filename: &str) -> &'static str {
    if filename == MEASURE_SCRIPT {
        "script"
    } else if filename.starts_with("tests/") {
        "test"
    } else if filename.starts_with("docs/") {
        "doc"
    } else if filename.to_ascii_lowercase().starts_with("readme") {
        "readme"
    } else if filename.to_ascii_lowercase().starts_with("license") {
        "license"
    } else {
        "resource"
    }
}

/// Write via a temp file and rename so readers never see a partial file.
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp.{}", file_name, std::process::id()));
    if let Err(e) = fs::write(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        e
    })
}

fn copy_measure_tree(
    from: &Path,
    to: &Path,
    source: &MeasureMetadata,
    template: &MeasureTemplate,
) -> Result<(), LoadError> {
    let walker = WalkDir::new(from)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| LoadError::io(from)(io::Error::from(e)))?;
        let rel = match entry.path().strip_prefix(from) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target: PathBuf = to.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(LoadError::io(&target))?;
        } else if entry.file_type().is_file() {
            if rel == Path::new(MEASURE_XML) {
                continue;
            }
            if rel == Path::new(MEASURE_SCRIPT) {
                let script = fs::read_to_string(entry.path()).map_err(LoadError::io(entry.path()))?;
                let script = rename_script(&script, source, template);
                fs::write(&target, script).map_err(LoadError::io(&target))?;
            } else {
                fs::copy(entry.path(), &target).map_err(LoadError::io(&target))?;
            }
        }
    }
    Ok(())
}

/// Point the script's class declaration and display name at the copy.
fn rename_script(script: &str, source: &MeasureMetadata, template: &MeasureTemplate) -> String {
    script
        .replace(
            &format!("class {} ", source.class_name),
            &format!("class {} ", template.class_name),
        )
        .replace(
            &format!("{}.new", source.class_name),
            &format!("{}.new", template.class_name),
        )
        .replace(
            &format!("'{}'", source.display_name),
            &format!("'{}'", template.display_name.replace('\'', "\\'")),
        )
}

fn template_arguments(measure_type: &str) -> Vec<ArgumentDecl> {
    match measure_type {
        "EnergyPlusMeasure" => {
            let mut arg = ArgumentDecl::new("zone_name", "New zone name", ArgumentType::String);
            arg.description = Some("This name will be used as the name of the new zone.".into());
            vec![arg]
        }
        "ReportingMeasure" => {
            let mut arg = ArgumentDecl::new(
                "report_drybulb_temp",
                "Add output variables for Drybulb Temperature",
                ArgumentType::Boolean,
            );
            arg.description = Some("Will add drybulb temp and report min/max values in html.".into());
            arg.default_value = Some("true".into());
            vec![arg]
        }
        _ => {
            let mut arg = ArgumentDecl::new("space_name", "New space name", ArgumentType::String);
            arg.description = Some("This name will be used as the name of the new space.".into());
            vec![arg]
        }
    }
}

fn template_attributes(measure_type: &str) -> Vec<Attribute> {
    vec![
        Attribute::string(MEASURE_TYPE_ATTRIBUTE, measure_type),
        Attribute::string("Intended Software Tool", "Apply Measure Now"),
        Attribute::string("Intended Use Case", "Model Articulation"),
        Attribute::boolean("Requires EnergyPlus Results", measure_type == "ReportingMeasure"),
    ]
}

fn render_script(template: &MeasureTemplate) -> String {
    let (base, run_signature, arguments_signature, body) = match template.measure_type.as_str() {
        "EnergyPlusMeasure" => (
            "EnergyPlusMeasure",
            "run(workspace, runner, user_arguments)",
            "arguments(workspace)",
            "    zone_name = OpenStudio::Measure::OSArgument.makeStringArgument('zone_name', true)\n    zone_name.setDisplayName('New zone name')\n    zone_name.setDescription('This name will be used as the name of the new zone.')\n    args << zone_name\n",
        ),
        "ReportingMeasure" => (
            "ReportingMeasure",
            "run(runner, user_arguments)",
            "arguments(model = nil)",
            "    report_drybulb_temp = OpenStudio::Measure::OSArgument.makeBoolArgument('report_drybulb_temp', true)\n    report_drybulb_temp.setDisplayName('Add output variables for Drybulb Temperature')\n    report_drybulb_temp.setDescription('Will add drybulb temp and report min/max values in html.')\n    report_drybulb_temp.setDefaultValue(true)\n    args << report_drybulb_temp\n",
        ),
        _ => (
            "ModelMeasure",
            "run(model, runner, user_arguments)",
            "arguments(model)",
            "    space_name = OpenStudio::Measure::OSArgument.makeStringArgument('space_name', true)\n    space_name.setDisplayName('New space name')\n    space_name.setDescription('This name will be used as the name of the new space.')\n    args << space_name\n",
        ),
    };

    let mut out = String::new();
    let _ = writeln!(out, "# start the measure");
    let _ = writeln!(out, "class {} < OpenStudio::Measure::{}", template.class_name, base);
    let _ = writeln!(out, "  def name\n    return '{}'\n  end\n", template.display_name.replace('\'', "\\'"));
    let _ = writeln!(out, "  def {}\n    args = OpenStudio::Measure::OSArgumentVector.new\n{}    return args\n  end\n", arguments_signature, body);
    let _ = writeln!(out, "  def {}\n    super\n    return true\n  end", run_signature);
    let _ = writeln!(out, "end\n");
    let _ = writeln!(out, "# register the measure to be used by the application");
    let _ = writeln!(out, "{}.new.registerWithApplication", template.class_name);
    out
}

// --- XML parsing -----------------------------------------------------------

fn parse_measure_xml(path: &Path, contents: &str) -> Result<MeasureMetadata, LoadError> {
    let doc = roxmltree::Document::parse(contents)
        .map_err(|e| LoadError::parse(path, e.to_string()))?;
    let root = doc.root_element();
    if !root.has_tag_name("measure") {
        return Err(LoadError::parse(path, "root element is not <measure>"));
    }

    let required = |name: &str| {
        child_text(&root, name)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LoadError::parse(path, format!("missing <{}>", name)))
    };

    let arguments = children(&root, "arguments", "argument")
        .map(|n| parse_argument(path, &n))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MeasureMetadata {
        directory: PathBuf::new(),
        schema_version: child_text(&root, "schema_version").unwrap_or_else(|| SCHEMA_VERSION.to_string()),
        name: required("name")?,
        uid: required("uid")?,
        version_id: required("version_id")?,
        version_modified: optional_text(&root, "version_modified"),
        xml_checksum: child_text(&root, "xml_checksum").unwrap_or_default(),
        class_name: required("class_name")?,
        display_name: child_text(&root, "display_name").unwrap_or_default(),
        description: child_text(&root, "description").unwrap_or_default(),
        modeler_description: child_text(&root, "modeler_description").unwrap_or_default(),
        arguments,
        outputs: children(&root, "outputs", "output").map(|n| parse_output(&n)).collect(),
        tags: children(&root, "tags", "tag")
            .filter_map(|n| n.text().map(str::to_string))
            .collect(),
        attributes: children(&root, "attributes", "attribute")
            .filter_map(|n| parse_attribute(&n))
            .collect(),
        files: children(&root, "files", "file").map(|n| parse_file(&n)).collect(),
    })
}

fn parse_argument(path: &Path, node: &roxmltree::Node<'_, '_>) -> Result<ArgumentDecl, LoadError> {
    let name = child_text(node, "name").unwrap_or_default();
    let type_text = child_text(node, "type").unwrap_or_default();
    let type_ = ArgumentType::parse(&type_text).ok_or_else(|| {
        LoadError::parse(path, format!("argument '{}' has unknown type '{}'", name, type_text))
    })?;

    Ok(ArgumentDecl {
        display_name: child_text(node, "display_name").unwrap_or_default(),
        description: optional_text(node, "description"),
        type_,
        units: optional_text(node, "units"),
        required: child_bool(node, "required"),
        model_dependent: child_bool(node, "model_dependent"),
        default_value: optional_text(node, "default_value"),
        min_value: optional_text(node, "min_value"),
        max_value: optional_text(node, "max_value"),
        choices: children(node, "choices", "choice")
            .map(|c| Choice {
                value: child_text(&c, "value").unwrap_or_default(),
                display_name: child_text(&c, "display_name").unwrap_or_default(),
            })
            .collect(),
        name,
    })
}

fn parse_output(node: &roxmltree::Node<'_, '_>) -> OutputDecl {
    OutputDecl {
        name: child_text(node, "name").unwrap_or_default(),
        display_name: child_text(node, "display_name").unwrap_or_default(),
        short_name: optional_text(node, "short_name"),
        description: optional_text(node, "description"),
        type_: child_text(node, "type").unwrap_or_default(),
        units: optional_text(node, "units"),
        model_dependent: child_bool(node, "model_dependent"),
    }
}

fn parse_attribute(node: &roxmltree::Node<'_, '_>) -> Option<Attribute> {
    Some(Attribute {
        name: child_text(node, "name")?,
        display_name: optional_text(node, "display_name"),
        value: child_text(node, "value").unwrap_or_default(),
        datatype: child_text(node, "datatype")
            .and_then(|d| AttributeType::parse(&d))
            .unwrap_or(AttributeType::String),
    })
}

fn parse_file(node: &roxmltree::Node<'_, '_>) -> MeasureFile {
    MeasureFile {
        filename: child_text(node, "filename").unwrap_or_default(),
        filetype: child_text(node, "filetype").unwrap_or_default(),
        usage_type: child_text(node, "usage_type").unwrap_or_default(),
        checksum: child_text(node, "checksum").unwrap_or_default(),
    }
}

fn child_element<'a, 'input>(
    node: &roxmltree::Node<'a, 'input>,
    name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Elements named `item` inside the `container` child of `node`.
fn children<'a, 'input: 'a>(
    node: &roxmltree::Node<'a, 'input>,
    container: &str,
    item: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> + 'a {
    child_element(node, container)
        .into_iter()
        .flat_map(|c| c.children())
        .filter(move |n| n.is_element() && n.tag_name().name() == item)
}

/// Exact text of a child element; an empty element yields an empty string.
fn child_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child_element(node, name).map(|n| n.text().unwrap_or("").to_string())
}

fn optional_text(node: &roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    child_text(node, name).filter(|t| !t.is_empty())
}

fn child_bool(node: &roxmltree::Node<'_, '_>, name: &str) -> bool {
    child_text(node, name).is_some_and(|t| t.trim().eq_ignore_ascii_case("true"))
}

// --- XML rendering ---------------------------------------------------------

fn render_measure_xml(m: &MeasureMetadata) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<measure>\n");
    element(&mut out, 1, "schema_version", &m.schema_version);
    element(&mut out, 1, "name", &m.name);
    element(&mut out, 1, "uid", &m.uid);
    element(&mut out, 1, "version_id", &m.version_id);
    optional(&mut out, 1, "version_modified", m.version_modified.as_deref());
    element(&mut out, 1, "xml_checksum", &m.xml_checksum);
    element(&mut out, 1, "class_name", &m.class_name);
    element(&mut out, 1, "display_name", &m.display_name);
    element(&mut out, 1, "description", &m.description);
    element(&mut out, 1, "modeler_description", &m.modeler_description);

    open(&mut out, 1, "arguments");
    for arg in &m.arguments {
        open(&mut out, 2, "argument");
        element(&mut out, 3, "name", &arg.name);
        element(&mut out, 3, "display_name", &arg.display_name);
        optional(&mut out, 3, "description", arg.description.as_deref());
        element(&mut out, 3, "type", arg.type_.as_str());
        optional(&mut out, 3, "units", arg.units.as_deref());
        element(&mut out, 3, "required", &arg.required.to_string());
        element(&mut out, 3, "model_dependent", &arg.model_dependent.to_string());
        optional(&mut out, 3, "default_value", arg.default_value.as_deref());
        optional(&mut out, 3, "min_value", arg.min_value.as_deref());
        optional(&mut out, 3, "max_value", arg.max_value.as_deref());
        if !arg.choices.is_empty() {
            open(&mut out, 3, "choices");
            for choice in &arg.choices {
                open(&mut out, 4, "choice");
                element(&mut out, 5, "value", &choice.value);
                element(&mut out, 5, "display_name", &choice.display_name);
                close(&mut out, 4, "choice");
            }
            close(&mut out, 3, "choices");
        }
        close(&mut out, 2, "argument");
    }
    close(&mut out, 1, "arguments");

    open(&mut out, 1, "outputs");
    for output in &m.outputs {
        open(&mut out, 2, "output");
        element(&mut out, 3, "name", &output.name);
        element(&mut out, 3, "display_name", &output.display_name);
        optional(&mut out, 3, "short_name", output.short_name.as_deref());
        optional(&mut out, 3, "description", output.description.as_deref());
        element(&mut out, 3, "type", &output.type_);
        optional(&mut out, 3, "units", output.units.as_deref());
        element(&mut out, 3, "model_dependent", &output.model_dependent.to_string());
        close(&mut out, 2, "output");
    }
    close(&mut out, 1, "outputs");

    open(&mut out, 1, "tags");
    for tag in &m.tags {
        element(&mut out, 2, "tag", tag);
    }
    close(&mut out, 1, "tags");

    open(&mut out, 1, "attributes");
    for attr in &m.attributes {
        open(&mut out, 2, "attribute");
        element(&mut out, 3, "name", &attr.name);
        optional(&mut out, 3, "display_name", attr.display_name.as_deref());
        element(&mut out, 3, "value", &attr.value);
        element(&mut out, 3, "datatype", attr.datatype.as_str());
        close(&mut out, 2, "attribute");
    }
    close(&mut out, 1, "attributes");

    open(&mut out, 1, "files");
    for file in &m.files {
        open(&mut out, 2, "file");
        element(&mut out, 3, "filename", &file.filename);
        element(&mut out, 3, "filetype", &file.filetype);
        element(&mut out, 3, "usage_type", &file.usage_type);
        element(&mut out, 3, "checksum", &file.checksum);
        close(&mut out, 2, "file");
    }
    close(&mut out, 1, "files");

    out.push_str("</measure>\n");
    out
}

fn indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat("  ").take(depth));
}

fn open(out: &mut String, depth: usize, name: &str) {
    indent(out, depth);
    let _ = writeln!(out, "<{}>", name);
}

fn close(out: &mut String, depth: usize, name: &str) {
    indent(out, depth);
    let _ = writeln!(out, "</{}>", name);
}

fn element(out: &mut String, depth: usize, name: &str, value: &str) {
    indent(out, depth);
    let _ = writeln!(out, "<{0}>{1}</{0}>", name, escape(value));
}

fn optional(out: &mut String, depth: usize, name: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        element(out, depth, name, value);
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\r' => escaped.push_str("&#xD;"),
            c if !is_xml_char(c) => {}
            _ => escaped.push(c),
        }
    }
    escaped
}
