//! create_measure operation handler.

use mm_protocol::ops::CreateMeasureRequest;
use mm_protocol::{RpcError, RpcRequest};

use crate::cache::CacheCoordinator;
use crate::shape::measure_summary;

use super::{measure_template, required_path, to_payload};

/// Handle the create_measure operation.
pub fn handle(request: &RpcRequest, coordinator: &mut CacheCoordinator) -> Result<serde_json::Value, RpcError> {
    let req: CreateMeasureRequest = request.payload_as()?;
    let measure_dir = required_path("measure_dir", &req.measure_dir)?;
    let template = measure_template(
        &req.name,
        &req.class_name,
        &req.taxonomy_tag,
        &req.measure_type,
        &req.description,
        &req.modeler_description,
    )?;

    let measure = coordinator.create_measure(&measure_dir, &template)?;
    let info = coordinator.get_argument_info(&measure, None);
    to_payload(&measure_summary(&measure, Some(&info)))
}
