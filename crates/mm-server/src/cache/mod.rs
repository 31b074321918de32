//! In-memory caches for models, measures, and derived argument information.
//!
//! Three maps, all owned by [`CacheCoordinator`]:
//! - models keyed by absolute path, validated by content checksum
//! - measures keyed by absolute directory, validated by metadata checksum and
//!   the newest script modification time
//! - argument info keyed by (measure directory, model path or none)
//!
//! Reloading a model or a measure purges every argument-info row scoped to
//! it. Nothing is persisted across restarts.

mod argument_cache;
mod coordinator;
mod measure_cache;
mod model_cache;

use std::env;
use std::path::{Component, Path, PathBuf};

pub use argument_cache::{ArgumentInfoCache, ArgumentKey};
pub use coordinator::CacheCoordinator;
pub use measure_cache::{MeasureCache, MeasureEntry};
pub use model_cache::{LoadedModel, ModelCache, ModelEntry};

/// Absolute, lexically normalized form of `path` used as a cache key.
///
/// Symlinks are not resolved, so a missing path still has a key.
pub fn cache_key(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
