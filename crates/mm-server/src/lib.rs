//! Measure Manager Engine
//!
//! Caches loaded building models, measure metadata, and script-derived
//! argument information, revalidating each against on-disk fingerprints
//! before use. All operations run behind one lock in [`RequestDispatcher`].
//!
//! This crate can be used in two modes:
//! - **Behind a transport**: the `measure-manager` binary serves it over HTTP
//!   or one request at a time over stdin/stdout
//! - **In-process library**: tests inject their own collaborators

pub mod cache;
pub mod collab;
pub mod dispatcher;
pub mod error;
pub mod fingerprint;
pub mod handlers;
pub mod measure;
pub mod model;
pub mod rpc;
pub mod shape;

pub use cache::{cache_key, ArgumentKey, CacheCoordinator, LoadedModel};
pub use collab::{
    ArgumentExtractor, Collaborators, CommandArgumentExtractor, DeclaredArgumentExtractor,
    ExtractorConfig, MeasureStore, ModelLoader, ModelTranslator, OsmModelLoader,
    WorkspaceTranslator, XmlMeasureStore,
};
pub use dispatcher::RequestDispatcher;
pub use error::{LoadError, ManagerError, ManagerResult, ScriptFailure, UpdateError};
pub use fingerprint::{Fingerprint, FingerprintDelta, MeasureFingerprint};
pub use measure::{
    ArgumentDecl, ArgumentInfo, ArgumentType, Attribute, AttributeType, Choice, MeasureFile,
    MeasureMetadata, MeasureTemplate, OutputDecl,
};
pub use model::{Model, ModelObject, Workspace};
pub use rpc::RpcHandler;
