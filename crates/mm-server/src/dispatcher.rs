//! Operation dispatcher.
//!
//! Routes requests to their handlers while holding the single lock around
//! the cache coordinator. The lock covers lookups, reloads, script runs, and
//! response construction, so operations apply in lock-acquisition order.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use mm_protocol::{ops::names, RpcError, RpcRequest, RpcResponse};
use tracing::{debug, error, warn};

use crate::cache::CacheCoordinator;
use crate::handlers;

/// Serializes every operation behind one lock.
pub struct RequestDispatcher {
    coordinator: Mutex<CacheCoordinator>,
}

impl RequestDispatcher {
    pub fn new(coordinator: CacheCoordinator) -> Self {
        Self {
            coordinator: Mutex::new(coordinator),
        }
    }

    /// Run one operation and shape its response.
    ///
    /// Never panics: a panicking handler becomes an `INTERNAL` error.
    pub fn dispatch(&self, request: &RpcRequest) -> RpcResponse {
        let mut coordinator = self
            .coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        debug!(op = %request.op, "dispatching");

        let result = panic::catch_unwind(AssertUnwindSafe(|| route(request, &mut coordinator)))
            .unwrap_or_else(|panic| {
                let message = panic_message(panic.as_ref());
                error!(op = %request.op, panic = %message, "handler panicked");
                Err(RpcError::internal(format!("{} panicked: {}", request.op, message)))
            });

        match result {
            Ok(payload) => RpcResponse::success(payload),
            Err(e) => {
                warn!(op = %request.op, code = %e.code, error = %e.message, "operation failed");
                RpcResponse::error(e)
            }
        }
    }

    /// Run `f` with the coordinator locked.
    pub fn with_coordinator<T>(&self, f: impl FnOnce(&mut CacheCoordinator) -> T) -> T {
        let mut coordinator = self
            .coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut coordinator)
    }
}

/// Dispatch the request to the appropriate operation handler.
fn route(request: &RpcRequest, coordinator: &mut CacheCoordinator) -> Result<serde_json::Value, RpcError> {
    match request.op.as_str() {
        names::UPDATE_MEASURES => handlers::update_measures::handle(request, coordinator),
        names::COMPUTE_ARGUMENTS => handlers::compute_arguments::handle(request, coordinator),
        names::CREATE_MEASURE => handlers::create_measure::handle(request, coordinator),
        names::DUPLICATE_MEASURE => handlers::duplicate_measure::handle(request, coordinator),
        names::INTERNAL_STATE => handlers::internal_state::handle(request, coordinator),
        names::LOAD_OSM => handlers::load_osm::handle(request, coordinator),
        _ => Err(RpcError::unknown_operation(&request.op)),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
