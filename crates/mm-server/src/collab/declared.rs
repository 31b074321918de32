//! Argument extractor that trusts the declarations already in `measure.xml`.

use crate::error::ScriptFailure;
use crate::measure::{ArgumentInfo, MeasureMetadata};
use crate::model::{Model, Workspace};

use super::ArgumentExtractor;

/// Returns the arguments and outputs recorded in the measure's metadata
/// without running its script. Model context is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredArgumentExtractor;

impl ArgumentExtractor for DeclaredArgumentExtractor {
    fn extract(
        &self,
        measure: &MeasureMetadata,
        _model: Option<&Model>,
        _workspace: Option<&Workspace>,
    ) -> Result<ArgumentInfo, ScriptFailure> {
        Ok(ArgumentInfo {
            arguments: measure.arguments.clone(),
            outputs: measure.outputs.clone(),
            error: None,
        })
    }
}
