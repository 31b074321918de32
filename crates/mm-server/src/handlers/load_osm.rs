//! load_osm operation handler.
//!
//! Forces a reload of the model. A model that cannot be loaded is reported as
//! `{"result": false}` rather than an error.

use std::path::Path;

use mm_protocol::ops::{LoadOsmRequest, LoadOsmResponse};
use mm_protocol::{RpcError, RpcRequest};

use crate::cache::CacheCoordinator;
use crate::error::ManagerError;

use super::to_payload;

/// Handle the load_osm operation.
pub fn handle(request: &RpcRequest, coordinator: &mut CacheCoordinator) -> Result<serde_json::Value, RpcError> {
    let req: LoadOsmRequest = request.payload_as()?;
    if req.osm_path.trim().is_empty() {
        return Err(RpcError::invalid_request("osm_path must not be empty"));
    }

    let result = match coordinator.get_model(Path::new(&req.osm_path), true) {
        Ok(_) => true,
        Err(ManagerError::ModelNotFound(_)) => false,
        Err(e) => return Err(e.into()),
    };
    to_payload(&LoadOsmResponse { result })
}
