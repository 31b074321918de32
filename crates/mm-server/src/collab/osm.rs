//! OpenStudio model (`.osm`) text loader and workspace translator.
//!
//! The format is a sequence of objects. Each object is a class name followed
//! by comma-separated fields and terminated by `;`. `!` starts a comment that
//! runs to the end of the line.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::LoadError;
use crate::model::{Model, ModelObject, Workspace};

use super::{ModelLoader, ModelTranslator};

/// Class of the object carrying the model version.
const VERSION_CLASS: &str = "OS:Version";

/// Loads `.osm` files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsmModelLoader;

impl ModelLoader for OsmModelLoader {
    fn load(&self, path: &Path) -> Result<Model, LoadError> {
        let contents = fs::read_to_string(path).map_err(LoadError::io(path))?;
        let objects = parse_objects(&contents).map_err(|message| LoadError::parse(path, message))?;

        let version = objects
            .iter()
            .find(|o| o.class_name.eq_ignore_ascii_case(VERSION_CLASS))
            .and_then(|o| o.fields.iter().find(|f| !f.starts_with('{')).cloned())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| LoadError::parse(path, "missing OS:Version object"))?;

        debug!(path = %path.display(), %version, objects = objects.len(), "parsed model");

        Ok(Model {
            path: path.to_path_buf(),
            version,
            objects,
        })
    }
}

/// Split model text into objects.
fn parse_objects(contents: &str) -> Result<Vec<ModelObject>, String> {
    let stripped: String = contents
        .lines()
        .map(|line| line.split('!').next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");

    let mut objects = Vec::new();
    let mut segments = stripped.split(';').peekable();
    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();
        if segment.trim().is_empty() {
            continue;
        }
        if is_last {
            return Err(format!(
                "unterminated object starting with '{}'",
                segment.trim().lines().next().unwrap_or("")
            ));
        }

        let mut parts = segment.split(',').map(str::trim);
        let class_name = parts.next().unwrap_or("").to_string();
        if class_name.is_empty() || class_name.contains(char::is_whitespace) {
            return Err(format!("invalid class name '{}'", class_name));
        }
        objects.push(ModelObject {
            class_name,
            fields: parts.map(str::to_string).collect(),
        });
    }

    if objects.is_empty() {
        return Err("no objects found".to_string());
    }
    Ok(objects)
}

/// Produces a workspace by dropping model-only objects, stripping the `OS:`
/// class prefix, and removing object handles.
#[derive(Debug, Clone)]
pub struct WorkspaceTranslator {
    model_only: HashSet<String>,
}

impl Default for WorkspaceTranslator {
    fn default() -> Self {
        let model_only = [
            VERSION_CLASS,
            "OS:ComponentData",
            "OS:Facility",
            "OS:LifeCycleCost:Parameters",
            "OS:YearDescription",
        ]
        .into_iter()
        .map(|c| c.to_ascii_lowercase())
        .collect();
        Self { model_only }
    }
}

impl ModelTranslator for WorkspaceTranslator {
    fn translate(&self, model: &Model) -> Result<Workspace, LoadError> {
        let objects = model
            .objects
            .iter()
            .filter(|o| !self.model_only.contains(&o.class_name.to_ascii_lowercase()))
            .map(|o| {
                let class_name = o
                    .class_name
                    .strip_prefix("OS:")
                    .unwrap_or(&o.class_name)
                    .to_string();
                let fields = o
                    .fields
                    .iter()
                    .skip_while(|f| f.starts_with('{'))
                    .cloned()
                    .collect();
                ModelObject { class_name, fields }
            })
            .collect();
        Ok(Workspace { objects })
    }
}
