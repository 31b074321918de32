//! Content fingerprints for cached artifacts.
//!
//! A model file is fingerprinted by the SHA-256 of its bytes. A measure
//! directory gets a two-part fingerprint: the checksum of its metadata file and
//! the newest modification time among its other files. The parts are always
//! computed independently so callers can tell which one moved.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// A SHA-256 fingerprint stored as a lowercase hex string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint bytes read from `reader`.
    pub fn from_reader(mut reader: impl Read) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0_u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// Fingerprint a file's contents without reading it into memory at once.
    pub fn from_file(path: impl AsRef<Path>) -> io::Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint of a measure directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureFingerprint {
    /// Checksum of the metadata file.
    pub metadata: Fingerprint,
    /// Newest mtime (nanoseconds since the epoch) among the remaining files.
    pub newest_script_mtime: Option<u128>,
}

/// Which parts of a measure fingerprint differ.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerprintDelta {
    pub metadata_changed: bool,
    pub scripts_changed: bool,
}

impl FingerprintDelta {
    pub fn is_changed(&self) -> bool {
        self.metadata_changed || self.scripts_changed
    }
}

impl MeasureFingerprint {
    /// Fingerprint `measure_dir`, whose metadata lives at `metadata_path`.
    ///
    /// Hidden entries are skipped. Fails if the metadata file cannot be read.
    pub fn compute(measure_dir: &Path, metadata_path: &Path) -> io::Result<Self> {
        let metadata = Fingerprint::from_file(metadata_path)?;
        let newest_script_mtime = newest_mtime(measure_dir, metadata_path)?;
        Ok(Self {
            metadata,
            newest_script_mtime,
        })
    }

    /// Compare against a freshly computed fingerprint.
    pub fn delta(&self, current: &Self) -> FingerprintDelta {
        FingerprintDelta {
            metadata_changed: self.metadata != current.metadata,
            scripts_changed: self.newest_script_mtime != current.newest_script_mtime,
        }
    }
}

fn newest_mtime(measure_dir: &Path, skip: &Path) -> io::Result<Option<u128>> {
    let mut newest = None;
    let walker = WalkDir::new(measure_dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() || entry.path() == skip {
            continue;
        }
        let modified = entry.metadata().map_err(io::Error::from)?.modified()?;
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        newest = newest.max(Some(nanos));
    }

    Ok(newest)
}

pub(crate) fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
