//! Loaded measure metadata keyed by directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fingerprint::MeasureFingerprint;
use crate::measure::MeasureMetadata;

/// A cached measure and the fingerprint it was loaded (or last saved) under.
#[derive(Debug, Clone)]
pub struct MeasureEntry {
    pub fingerprint: MeasureFingerprint,
    pub measure: Arc<MeasureMetadata>,
}

#[derive(Debug, Default)]
pub struct MeasureCache {
    entries: BTreeMap<PathBuf, MeasureEntry>,
}

impl MeasureCache {
    pub fn get(&self, dir: &Path) -> Option<&MeasureEntry> {
        self.entries.get(dir)
    }

    pub fn insert(&mut self, dir: PathBuf, entry: MeasureEntry) {
        self.entries.insert(dir, entry);
    }

    pub fn remove(&mut self, dir: &Path) -> Option<MeasureEntry> {
        self.entries.remove(dir)
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.entries.contains_key(dir)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in directory order.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &MeasureEntry)> {
        self.entries.iter()
    }
}
