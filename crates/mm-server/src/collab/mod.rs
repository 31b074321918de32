//! Collaborators the cache coordinator delegates to.
//!
//! The coordinator only knows these traits. Default implementations live in
//! the submodules: an `.osm` text loader, a model-to-workspace translator, a
//! `measure.xml` store, and argument extractors.

mod command;
mod declared;
mod osm;
mod xml_store;

use std::path::{Path, PathBuf};

pub use command::{CommandArgumentExtractor, ExtractorConfig};
pub use declared::DeclaredArgumentExtractor;
pub use osm::{OsmModelLoader, WorkspaceTranslator};
pub use xml_store::XmlMeasureStore;

use crate::error::{LoadError, ScriptFailure};
use crate::measure::{ArgumentInfo, MeasureMetadata, MeasureTemplate, MEASURE_XML};
use crate::model::{Model, Workspace};

/// Loads (and version-translates) a model file.
pub trait ModelLoader: Send {
    fn load(&self, path: &Path) -> Result<Model, LoadError>;
}

/// Derives the secondary workspace representation of a model.
pub trait ModelTranslator: Send {
    fn translate(&self, model: &Model) -> Result<Workspace, LoadError>;
}

/// Reads, writes, and inspects measure directories.
pub trait MeasureStore: Send {
    /// Load the metadata of the measure in `dir`.
    fn load(&self, dir: &Path) -> Result<MeasureMetadata, LoadError>;

    /// Refresh the file manifest and checksums of `measure` and write it to disk.
    fn save(&self, measure: &mut MeasureMetadata) -> Result<(), LoadError>;

    /// Create a new measure in `dir`.
    fn create(&self, dir: &Path, template: &MeasureTemplate) -> Result<MeasureMetadata, LoadError>;

    /// Copy `source` into `dir`, renamed per `template`.
    fn duplicate(
        &self,
        source: &MeasureMetadata,
        dir: &Path,
        template: &MeasureTemplate,
    ) -> Result<MeasureMetadata, LoadError>;

    /// Whether the measure's files differ from its recorded manifest.
    fn files_changed(&self, measure: &MeasureMetadata) -> bool;

    /// Whether the metadata on disk differs from `measure` or from its own checksum.
    fn xml_changed(&self, measure: &MeasureMetadata) -> bool;

    /// Location of the metadata file for a measure directory.
    fn metadata_path(&self, dir: &Path) -> PathBuf {
        dir.join(MEASURE_XML)
    }
}

/// Runs a measure's script to enumerate its arguments and outputs.
///
/// Implementations execute author-supplied code and may be slow or fail.
pub trait ArgumentExtractor: Send {
    fn extract(
        &self,
        measure: &MeasureMetadata,
        model: Option<&Model>,
        workspace: Option<&Workspace>,
    ) -> Result<ArgumentInfo, ScriptFailure>;
}

/// The full set of collaborators handed to a coordinator.
pub struct Collaborators {
    pub model_loader: Box<dyn ModelLoader>,
    pub translator: Box<dyn ModelTranslator>,
    pub measure_store: Box<dyn MeasureStore>,
    pub extractor: Box<dyn ArgumentExtractor>,
}

impl Collaborators {
    /// Default collaborators for the given extractor configuration.
    ///
    /// Without an extractor program, arguments are read from the declarations
    /// stored in each measure's metadata.
    pub fn standard(extractor: &ExtractorConfig) -> Self {
        let extractor: Box<dyn ArgumentExtractor> = if extractor.program.is_some() {
            Box::new(CommandArgumentExtractor::new(extractor.clone()))
        } else {
            Box::new(DeclaredArgumentExtractor)
        };

        Self {
            model_loader: Box::new(OsmModelLoader),
            translator: Box::new(WorkspaceTranslator::default()),
            measure_store: Box::new(XmlMeasureStore),
            extractor,
        }
    }
}
