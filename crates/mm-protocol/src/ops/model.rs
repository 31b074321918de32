//! load_osm operation types.
//!
//! Forces a reload of a model into the cache.

use serde::{Deserialize, Serialize};

/// load_osm request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOsmRequest {
    /// Model file to load.
    pub osm_path: String,
}

/// load_osm response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOsmResponse {
    /// Whether the model loaded.
    pub result: bool,
}
