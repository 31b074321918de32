//! Shared fixtures for the integration tests.
//!
//! Collaborators here wrap the default implementations and count calls, so
//! tests can assert when the cache went to disk or ran a script.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use mm_protocol::{RpcRequest, RpcResponse};
use mm_server::{
    ArgumentDecl, ArgumentExtractor, ArgumentInfo, ArgumentType, CacheCoordinator, Choice,
    Collaborators, LoadError, MeasureMetadata, MeasureStore, MeasureTemplate, Model, ModelLoader,
    ModelTranslator, OsmModelLoader, OutputDecl, RequestDispatcher, ScriptFailure, Workspace,
    WorkspaceTranslator, XmlMeasureStore,
};

/// Call counters shared between a test and its collaborators.
#[derive(Debug, Default)]
pub struct Counters {
    pub model_loads: AtomicUsize,
    pub translations: AtomicUsize,
    pub extractions: AtomicUsize,
    /// When set, every extraction fails.
    pub extractor_fails: AtomicBool,
    /// When set, every translation fails.
    pub translator_fails: AtomicBool,
    /// When set, extractions also report an output whose optional fields are empty.
    pub blank_output: AtomicBool,
}

impl Counters {
    pub fn model_loads(&self) -> usize {
        self.model_loads.load(Ordering::SeqCst)
    }

    pub fn translations(&self) -> usize {
        self.translations.load(Ordering::SeqCst)
    }

    pub fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    pub fn fail_extractions(&self, fail: bool) {
        self.extractor_fails.store(fail, Ordering::SeqCst);
    }

    pub fn fail_translations(&self, fail: bool) {
        self.translator_fails.store(fail, Ordering::SeqCst);
    }

    pub fn report_blank_output(&self, blank: bool) {
        self.blank_output.store(blank, Ordering::SeqCst);
    }
}

pub struct CountingLoader(pub Arc<Counters>);

impl ModelLoader for CountingLoader {
    fn load(&self, path: &Path) -> Result<Model, LoadError> {
        self.0.model_loads.fetch_add(1, Ordering::SeqCst);
        OsmModelLoader.load(path)
    }
}

pub struct CountingTranslator(pub Arc<Counters>);

impl ModelTranslator for CountingTranslator {
    fn translate(&self, model: &Model) -> Result<Workspace, LoadError> {
        self.0.translations.fetch_add(1, Ordering::SeqCst);
        if self.0.translator_fails.load(Ordering::SeqCst) {
            return Err(LoadError::Translation("unsupported object".into()));
        }
        WorkspaceTranslator::default().translate(model)
    }
}

/// Returns the declared arguments. With a model, adds a model-dependent
/// `space_name` choice listing the model's spaces.
pub struct CountingExtractor(pub Arc<Counters>);

impl ArgumentExtractor for CountingExtractor {
    fn extract(
        &self,
        measure: &MeasureMetadata,
        model: Option<&Model>,
        _workspace: Option<&Workspace>,
    ) -> Result<ArgumentInfo, ScriptFailure> {
        self.0.extractions.fetch_add(1, Ordering::SeqCst);
        if self.0.extractor_fails.load(Ordering::SeqCst) {
            return Err(ScriptFailure::Raised(format!(
                "undefined method `arguments' for {}",
                measure.class_name
            )));
        }

        let mut arguments = measure.arguments.clone();
        if let Some(model) = model {
            let mut arg = ArgumentDecl::new("space_name", "Space", ArgumentType::Choice);
            arg.model_dependent = true;
            arg.choices = model
                .objects_of_class("OS:Space")
                .filter_map(|o| o.name())
                .map(|name| Choice {
                    value: name.to_string(),
                    display_name: name.to_string(),
                })
                .collect();
            arguments.retain(|a| a.name != "space_name");
            arguments.push(arg);
        }

        let mut outputs = measure.outputs.clone();
        if self.0.blank_output.load(Ordering::SeqCst) {
            outputs.retain(|o| o.name != "total_area");
            outputs.push(OutputDecl {
                name: "total_area".into(),
                display_name: "Total Area".into(),
                short_name: Some(String::new()),
                description: Some(String::new()),
                type_: "Double".into(),
                units: Some(String::new()),
                model_dependent: false,
            });
        }

        Ok(ArgumentInfo {
            arguments,
            outputs,
            error: None,
        })
    }
}

pub fn collaborators(counters: &Arc<Counters>) -> Collaborators {
    Collaborators {
        model_loader: Box::new(CountingLoader(Arc::clone(counters))),
        translator: Box::new(CountingTranslator(Arc::clone(counters))),
        measure_store: Box::new(XmlMeasureStore),
        extractor: Box::new(CountingExtractor(Arc::clone(counters))),
    }
}

pub fn coordinator(counters: &Arc<Counters>) -> CacheCoordinator {
    CacheCoordinator::new(collaborators(counters))
}

pub fn dispatcher(counters: &Arc<Counters>) -> RequestDispatcher {
    RequestDispatcher::new(coordinator(counters))
}

pub fn call(dispatcher: &RequestDispatcher, op: &str, payload: serde_json::Value) -> RpcResponse {
    dispatcher.dispatch(&RpcRequest::new(op, payload))
}

/// Write a model with one `OS:Space` per name.
pub fn write_model(path: &Path, spaces: &[&str]) {
    let mut text = String::from(
        "\nOS:Version,\n  {00000000-0000-0000-0000-000000000001}, !- Handle\n  3.7.0;                                  !- Version Identifier\n",
    );
    for (i, space) in spaces.iter().enumerate() {
        text.push_str(&format!(
            "\nOS:Space,\n  {{00000000-0000-0000-0000-1{:011}}}, !- Handle\n  {};                                !- Name\n",
            i, space
        ));
    }
    fs::write(path, text).unwrap();
}

pub fn template(display_name: &str, measure_type: &str) -> MeasureTemplate {
    MeasureTemplate {
        display_name: display_name.to_string(),
        class_name: display_name.replace(' ', ""),
        taxonomy_tag: "Envelope.Form".to_string(),
        measure_type: measure_type.to_string(),
        description: format!("{} description", display_name),
        modeler_description: String::new(),
    }
}

/// Create a measure on disk without going through a coordinator.
pub fn create_measure_on_disk(dir: &Path, display_name: &str) -> MeasureMetadata {
    XmlMeasureStore
        .create(dir, &template(display_name, "ModelMeasure"))
        .unwrap()
}

/// Push the measure script's mtime forward without changing its contents.
pub fn touch_script(dir: &Path) {
    let later = filetime::FileTime::from_unix_time(4_000_000_000, 0);
    filetime::set_file_mtime(dir.join("measure.rb"), later).unwrap();
}

/// Rewrite the measure script and push its mtime forward.
pub fn edit_script(dir: &Path, contents: &str) -> PathBuf {
    let script = dir.join("measure.rb");
    fs::write(&script, contents).unwrap();
    let later = filetime::FileTime::from_unix_time(4_000_000_000, 0);
    filetime::set_file_mtime(&script, later).unwrap();
    script
}
