//! Measure Manager - local caching service for building-energy measures
//!
//! The engine lives in `mm-server` and the wire types in `mm-protocol`. This
//! crate adds layered configuration and the HTTP transport used by the
//! `measure-manager` binary.

pub mod config;
pub mod server;

pub use config::{ConfigError, EffectiveConfig, ServiceConfig};
pub use server::{bind, handle_request, serve, ServerError};

use mm_server::{CacheCoordinator, Collaborators, RequestDispatcher};

/// A dispatcher over the default collaborators for `config`.
pub fn build_dispatcher(config: &ServiceConfig) -> RequestDispatcher {
    let collaborators = Collaborators::standard(&config.extractor);
    RequestDispatcher::new(CacheCoordinator::new(collaborators))
}
