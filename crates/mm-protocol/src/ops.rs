//! Operation-specific types.

pub mod arguments;
pub mod create;
pub mod measures;
pub mod model;
pub mod state;

pub use arguments::ComputeArgumentsRequest;
pub use create::{CreateMeasureRequest, DuplicateMeasureRequest};
pub use measures::UpdateMeasuresRequest;
pub use model::{LoadOsmRequest, LoadOsmResponse};
pub use state::{CachedArgumentInfo, CachedModel, InternalStateResponse};

/// Known operation names.
pub mod names {
    pub const UPDATE_MEASURES: &str = "update_measures";
    pub const COMPUTE_ARGUMENTS: &str = "compute_arguments";
    pub const CREATE_MEASURE: &str = "create_measure";
    pub const DUPLICATE_MEASURE: &str = "duplicate_measure";
    pub const INTERNAL_STATE: &str = "internal_state";
    pub const LOAD_OSM: &str = "load_osm";

    /// All operations, in documentation order.
    pub const ALL: &[&str] = &[
        UPDATE_MEASURES,
        COMPUTE_ARGUMENTS,
        CREATE_MEASURE,
        DUPLICATE_MEASURE,
        INTERNAL_STATE,
        LOAD_OSM,
    ];
}
