//! Loaded models keyed by path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fingerprint::Fingerprint;
use crate::model::{Model, Workspace};

/// A cached model and the checksum it was loaded under.
#[derive(Debug, Clone)]
pub struct ModelEntry {
    pub fingerprint: Fingerprint,
    pub model: Arc<Model>,
    /// `None` when translation failed.
    pub workspace: Option<Arc<Workspace>>,
}

/// A model handed out for the duration of one request.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub path: PathBuf,
    pub model: Arc<Model>,
    pub workspace: Option<Arc<Workspace>>,
}

#[derive(Debug, Default)]
pub struct ModelCache {
    entries: BTreeMap<PathBuf, ModelEntry>,
}

impl ModelCache {
    pub fn get(&self, path: &Path) -> Option<&ModelEntry> {
        self.entries.get(path)
    }

    pub fn insert(&mut self, path: PathBuf, entry: ModelEntry) {
        self.entries.insert(path, entry);
    }

    pub fn remove(&mut self, path: &Path) -> Option<ModelEntry> {
        self.entries.remove(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &ModelEntry)> {
        self.entries.iter()
    }
}
