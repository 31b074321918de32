//! compute_arguments operation handler.

use mm_protocol::ops::ComputeArgumentsRequest;
use mm_protocol::{RpcError, RpcRequest};
use std::path::Path;

use crate::cache::CacheCoordinator;
use crate::shape::measure_summary;

use super::{required_path, to_payload};

/// Handle the compute_arguments operation.
///
/// The measure is resolved before the model, so a missing measure is
/// reported even when the model is missing too.
pub fn handle(request: &RpcRequest, coordinator: &mut CacheCoordinator) -> Result<serde_json::Value, RpcError> {
    let req: ComputeArgumentsRequest = request.payload_as()?;
    let measure_dir = required_path("measure_dir", &req.measure_dir)?;

    let measure = coordinator.get_measure(&measure_dir, false)?;
    let model = match req.model_path() {
        Some(path) => Some(coordinator.get_model(Path::new(path), false)?),
        None => None,
    };
    let info = coordinator.get_argument_info(&measure, model.as_ref());

    to_payload(&measure_summary(&measure, Some(&info)))
}
