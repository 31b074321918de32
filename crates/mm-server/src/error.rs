//! Error types for the cache coordinator and its collaborators.

use std::io;
use std::path::{Path, PathBuf};

use mm_protocol::RpcError;
use thiserror::Error;

/// Failure to load, parse, or persist a model or measure.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("a measure already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("translation failed: {0}")]
    Translation(String),
}

impl LoadError {
    /// Build a mapper that tags an I/O error with the path it happened on.
    pub fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create a parse error.
    pub fn parse(path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// The argument extractor failed while running a measure script.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptFailure {
    #[error("failed to start argument extractor: {0}")]
    Spawn(String),

    #[error("argument extractor exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },

    #[error("argument extractor timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    #[error("argument extractor produced invalid output: {0}")]
    InvalidOutput(String),

    #[error("{0}")]
    Raised(String),
}

/// Why the drift self-heal step failed.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("re-extracting arguments failed: {0}")]
    Script(#[from] ScriptFailure),

    #[error("persisting metadata failed: {0}")]
    Persist(#[from] LoadError),
}

/// Errors surfaced by the cache coordinator.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("cannot load measure at {}", .0.display())]
    MeasureNotFound(PathBuf),

    #[error("cannot load model at {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("a measure already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("failed to update measure at {}", path.display())]
    LoadFailure {
        path: PathBuf,
        #[source]
        source: UpdateError,
    },

    #[error(transparent)]
    Store(#[from] LoadError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for coordinator operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Render an error and its sources, outermost first.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        chain.push(source.to_string());
        current = source.source();
    }
    chain
}

impl From<ManagerError> for RpcError {
    fn from(err: ManagerError) -> Self {
        let trace = error_chain(&err);
        let rpc = match &err {
            ManagerError::MeasureNotFound(path) => {
                RpcError::measure_not_found(&path.to_string_lossy())
            }
            ManagerError::ModelNotFound(path) => RpcError::model_not_found(&path.to_string_lossy()),
            ManagerError::AlreadyExists(path) => RpcError::already_exists(&path.to_string_lossy()),
            ManagerError::LoadFailure { path, source } => {
                RpcError::load_failure(&path.to_string_lossy(), &source.to_string())
            }
            ManagerError::Store(_) | ManagerError::Io(_) => RpcError::internal(err.to_string()),
        };
        rpc.with_trace(trace)
    }
}
