//! update_measures operation handler.
//!
//! Returns a summary for every measure directly under `measures_dir`, with
//! arguments computed without a model.

use std::fs;
use std::path::{Path, PathBuf};

use mm_protocol::ops::UpdateMeasuresRequest;
use mm_protocol::{MeasureSummary, RpcError, RpcRequest};

use crate::cache::{cache_key, CacheCoordinator};
use crate::error::ManagerError;
use crate::fingerprint::is_hidden;
use crate::measure::MEASURE_XML;
use crate::shape::measure_summary;

use super::{required_path, to_payload};

/// Handle the update_measures operation.
pub fn handle(request: &RpcRequest, coordinator: &mut CacheCoordinator) -> Result<serde_json::Value, RpcError> {
    let req: UpdateMeasuresRequest = request.payload_as()?;
    let root = cache_key(&required_path("measures_dir", &req.measures_dir)?);

    let mut summaries: Vec<MeasureSummary> = Vec::new();
    for dir in measure_dirs(&root)? {
        let measure = coordinator.get_measure(&dir, false)?;
        let info = coordinator.get_argument_info(&measure, None);
        summaries.push(measure_summary(&measure, Some(&info)));
    }

    to_payload(&summaries)
}

/// Subdirectories of `root` holding a metadata file, sorted.
fn measure_dirs(root: &Path) -> Result<Vec<PathBuf>, ManagerError> {
    if !root.is_dir() {
        return Err(ManagerError::MeasureNotFound(root.to_path_buf()));
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(Result::ok)
        .filter(|e| !is_hidden(&e.file_name()))
        .map(|e| e.path())
        .filter(|p| p.is_dir() && p.join(MEASURE_XML).is_file())
        .collect();
    dirs.sort();
    Ok(dirs)
}
