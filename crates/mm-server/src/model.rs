//! In-memory building model and its translated workspace.

use std::path::PathBuf;

/// One object of a model or workspace: a class name and its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelObject {
    pub class_name: String,
    pub fields: Vec<String>,
}

impl ModelObject {
    /// The object's name field, by convention the one after the handle.
    pub fn name(&self) -> Option<&str> {
        let first = self.fields.first()?;
        if first.starts_with('{') {
            self.fields.get(1).map(String::as_str)
        } else {
            Some(first.as_str())
        }
    }
}

/// A loaded building model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    /// File the model was loaded from.
    pub path: PathBuf,
    /// Version identifier from the `OS:Version` object.
    pub version: String,
    pub objects: Vec<ModelObject>,
}

impl Model {
    /// Objects of the given class, in file order.
    pub fn objects_of_class<'a>(&'a self, class_name: &'a str) -> impl Iterator<Item = &'a ModelObject> + 'a {
        self.objects
            .iter()
            .filter(move |o| o.class_name.eq_ignore_ascii_case(class_name))
    }
}

/// Simulation-ready representation derived from a [`Model`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    pub objects: Vec<ModelObject>,
}
