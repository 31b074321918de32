//! internal_state operation handler.
//!
//! Dumps the caches as they are. Nothing is reloaded and no script runs.

use mm_protocol::ops::{CachedModel, InternalStateResponse};
use mm_protocol::{RpcError, RpcRequest};

use crate::cache::CacheCoordinator;
use crate::shape::{cached_argument_info, measure_summary};

use super::to_payload;

/// Handle the internal_state operation.
pub fn handle(_request: &RpcRequest, coordinator: &mut CacheCoordinator) -> Result<serde_json::Value, RpcError> {
    let coordinator: &CacheCoordinator = coordinator;
    let osms = coordinator
        .models()
        .map(|(path, fingerprint)| CachedModel {
            osm_path: path.to_string_lossy().to_string(),
            checksum: fingerprint.to_string(),
        })
        .collect();

    let measures = coordinator
        .measures()
        .map(|measure| {
            let info = coordinator.cached_argument_info(&measure.directory);
            measure_summary(measure, info.as_deref())
        })
        .collect();

    let measure_info = coordinator
        .argument_infos()
        .map(|(key, info)| cached_argument_info(key, info))
        .collect();

    to_payload(&InternalStateResponse {
        osms,
        measures,
        measure_info,
    })
}
