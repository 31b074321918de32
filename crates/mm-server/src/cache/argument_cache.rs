//! Argument information keyed by (measure, model).
//!
//! Rows are never updated in place. They are inserted once and purged in
//! bulk when either parent is reloaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::measure::ArgumentInfo;

/// Key of one argument-info row. `model_path == None` means no model context.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArgumentKey {
    pub measure_dir: PathBuf,
    pub model_path: Option<PathBuf>,
}

impl ArgumentKey {
    pub fn new(measure_dir: &Path, model_path: Option<&Path>) -> Self {
        Self {
            measure_dir: measure_dir.to_path_buf(),
            model_path: model_path.map(Path::to_path_buf),
        }
    }
}

#[derive(Debug, Default)]
pub struct ArgumentInfoCache {
    entries: BTreeMap<ArgumentKey, Arc<ArgumentInfo>>,
}

impl ArgumentInfoCache {
    pub fn get(&self, key: &ArgumentKey) -> Option<&Arc<ArgumentInfo>> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: ArgumentKey, info: Arc<ArgumentInfo>) {
        self.entries.insert(key, info);
    }

    pub fn contains(&self, key: &ArgumentKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every row for `measure_dir`. Returns how many were removed.
    pub fn purge_measure(&mut self, measure_dir: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.measure_dir != measure_dir);
        before - self.entries.len()
    }

    /// Drop every row computed against `model_path`. Returns how many were removed.
    pub fn purge_model(&mut self, model_path: &Path) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| key.model_path.as_deref() != Some(model_path));
        before - self.entries.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ArgumentKey, &Arc<ArgumentInfo>)> {
        self.entries.iter()
    }
}
