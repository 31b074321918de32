//! Get-or-reload protocol over the three caches.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::collab::Collaborators;
use crate::error::{LoadError, ManagerError, ManagerResult, UpdateError};
use crate::fingerprint::{Fingerprint, MeasureFingerprint};
use crate::measure::{ArgumentInfo, MeasureMetadata, MeasureTemplate, MEASURE_SCRIPT, MEASURE_XML};

use super::{
    cache_key, ArgumentInfoCache, ArgumentKey, LoadedModel, MeasureCache, MeasureEntry,
    ModelCache, ModelEntry,
};

/// Owns the model, measure, and argument-info caches.
///
/// Not internally synchronized; the dispatcher holds it behind one lock for
/// the whole of every request.
pub struct CacheCoordinator {
    collaborators: Collaborators,
    models: ModelCache,
    measures: MeasureCache,
    argument_info: ArgumentInfoCache,
}

impl CacheCoordinator {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            models: ModelCache::default(),
            measures: MeasureCache::default(),
            argument_info: ArgumentInfoCache::default(),
        }
    }

    /// Return the model at `path`, reloading it if it changed on disk.
    ///
    /// A reload purges every argument-info row computed against the model.
    pub fn get_model(&mut self, path: &Path, force_reload: bool) -> ManagerResult<LoadedModel> {
        let key = cache_key(path);

        let live = match Fingerprint::from_file(&key) {
            Ok(fp) => fp,
            Err(e) => {
                debug!(osm_path = %key.display(), error = %e, "model not readable");
                self.evict_model(&key);
                return Err(ManagerError::ModelNotFound(key));
            }
        };

        if !force_reload {
            if let Some(entry) = self.models.get(&key) {
                if entry.fingerprint == live {
                    debug!(osm_path = %key.display(), "model cache hit");
                    return Ok(LoadedModel {
                        path: key,
                        model: Arc::clone(&entry.model),
                        workspace: entry.workspace.clone(),
                    });
                }
            }
        }

        let model = match self.collaborators.model_loader.load(&key) {
            Ok(model) => Arc::new(model),
            Err(e) => {
                warn!(osm_path = %key.display(), error = %e, "failed to load model");
                self.evict_model(&key);
                return Err(ManagerError::ModelNotFound(key));
            }
        };
        let workspace = match self.collaborators.translator.translate(&model) {
            Ok(workspace) => Some(Arc::new(workspace)),
            Err(e) => {
                warn!(osm_path = %key.display(), error = %e, "model translation failed");
                None
            }
        };

        self.models.insert(
            key.clone(),
            ModelEntry {
                fingerprint: live,
                model: Arc::clone(&model),
                workspace: workspace.clone(),
            },
        );
        let purged = self.argument_info.purge_model(&key);
        info!(osm_path = %key.display(), purged, "loaded model");

        Ok(LoadedModel {
            path: key,
            model,
            workspace,
        })
    }

    /// Return the measure in `dir`, reloading and self-healing as needed.
    ///
    /// When the store reports that the measure's files or metadata drifted,
    /// arguments are re-extracted without a model, applied, and saved before
    /// the measure is returned. A failure in that step evicts the measure and
    /// is returned as [`ManagerError::LoadFailure`].
    pub fn get_measure(&mut self, dir: &Path, force_reload: bool) -> ManagerResult<Arc<MeasureMetadata>> {
        let key = cache_key(dir);
        let metadata_path = self.collaborators.measure_store.metadata_path(&key);

        let live = match MeasureFingerprint::compute(&key, &metadata_path) {
            Ok(fp) => fp,
            Err(e) => {
                debug!(measure_dir = %key.display(), error = %e, "measure not readable");
                self.evict_measure(&key);
                return Err(ManagerError::MeasureNotFound(key));
            }
        };

        // A script touched since the last load needs re-extraction even when
        // its content checksum is unchanged.
        let mut scripts_touched = false;
        let cached = match self.measures.get(&key) {
            Some(entry) if !force_reload => {
                let delta = entry.fingerprint.delta(&live);
                if delta.is_changed() {
                    debug!(
                        measure_dir = %key.display(),
                        metadata_changed = delta.metadata_changed,
                        scripts_changed = delta.scripts_changed,
                        "measure fingerprint changed"
                    );
                    scripts_touched = delta.scripts_changed;
                    None
                } else {
                    Some(Arc::clone(&entry.measure))
                }
            }
            _ => None,
        };

        let measure = match cached {
            Some(measure) => {
                debug!(measure_dir = %key.display(), "measure cache hit");
                measure
            }
            None => {
                let measure = match self.collaborators.measure_store.load(&key) {
                    Ok(measure) => Arc::new(measure),
                    Err(e) => {
                        warn!(measure_dir = %key.display(), error = %e, "failed to load measure");
                        self.evict_measure(&key);
                        return Err(ManagerError::MeasureNotFound(key));
                    }
                };
                self.measures.insert(
                    key.clone(),
                    MeasureEntry {
                        fingerprint: live,
                        measure: Arc::clone(&measure),
                    },
                );
                let purged = self.argument_info.purge_measure(&key);
                info!(measure_dir = %key.display(), purged, "loaded measure");
                measure
            }
        };

        let store = &self.collaborators.measure_store;
        let files_changed = store.files_changed(&measure);
        let xml_changed = store.xml_changed(&measure);
        if !(files_changed || xml_changed || scripts_touched) {
            return Ok(measure);
        }

        info!(
            measure_dir = %key.display(),
            files_changed,
            xml_changed,
            scripts_touched,
            "measure drifted, updating"
        );
        match self.refresh_measure(&key, &metadata_path, &measure, scripts_touched) {
            Ok((updated, info, fingerprint)) => {
                let updated = Arc::new(updated);
                self.measures.insert(
                    key.clone(),
                    MeasureEntry {
                        fingerprint,
                        measure: Arc::clone(&updated),
                    },
                );
                self.argument_info.purge_measure(&key);
                self.argument_info
                    .insert(ArgumentKey::new(&key, None), Arc::new(info));
                Ok(updated)
            }
            Err(source) => {
                warn!(measure_dir = %key.display(), error = %source, "measure update failed");
                self.evict_measure(&key);
                Err(ManagerError::LoadFailure { path: key, source })
            }
        }
    }

    /// Re-extract, apply, save, and re-fingerprint a drifted measure.
    fn refresh_measure(
        &self,
        dir: &Path,
        metadata_path: &Path,
        measure: &MeasureMetadata,
        new_version: bool,
    ) -> Result<(MeasureMetadata, ArgumentInfo, MeasureFingerprint), UpdateError> {
        let info = self.collaborators.extractor.extract(measure, None, None)?;
        let mut updated = measure.clone();
        updated.apply_argument_info(&info);
        if new_version {
            updated.bump_version();
        }
        self.collaborators.measure_store.save(&mut updated)?;
        let fingerprint =
            MeasureFingerprint::compute(dir, metadata_path).map_err(LoadError::io(metadata_path))?;
        Ok((updated, info, fingerprint))
    }

    /// Argument info for `measure` in the context of `model`.
    ///
    /// Extractor failures are cached as placeholders carrying the error text.
    pub fn get_argument_info(
        &mut self,
        measure: &MeasureMetadata,
        model: Option<&LoadedModel>,
    ) -> Arc<ArgumentInfo> {
        let key = ArgumentKey::new(&measure.directory, model.map(|m| m.path.as_path()));
        if let Some(info) = self.argument_info.get(&key) {
            debug!(measure_dir = %key.measure_dir.display(), "argument info cache hit");
            return Arc::clone(info);
        }

        let info = match self.collaborators.extractor.extract(
            measure,
            model.map(|m| m.model.as_ref()),
            model.and_then(|m| m.workspace.as_deref()),
        ) {
            Ok(info) => info,
            Err(e) => {
                warn!(measure_dir = %key.measure_dir.display(), error = %e, "argument extraction failed");
                ArgumentInfo::failed(e.to_string())
            }
        };
        let info = Arc::new(info);
        self.argument_info.insert(key, Arc::clone(&info));
        info
    }

    /// Create a new measure in `dir` and cache it.
    pub fn create_measure(
        &mut self,
        dir: &Path,
        template: &MeasureTemplate,
    ) -> ManagerResult<Arc<MeasureMetadata>> {
        let key = cache_key(dir);
        let dir_existed = key.exists();
        self.collaborators
            .measure_store
            .create(&key, template)
            .map_err(store_error)?;
        self.load_new_measure(&key, dir_existed)
    }

    /// Copy the measure in `source_dir` to `dir` under a new name and cache it.
    pub fn duplicate_measure(
        &mut self,
        source_dir: &Path,
        dir: &Path,
        template: &MeasureTemplate,
    ) -> ManagerResult<Arc<MeasureMetadata>> {
        let source = self.get_measure(source_dir, false)?;
        let key = cache_key(dir);
        let dir_existed = key.exists();
        self.collaborators
            .measure_store
            .duplicate(&source, &key, template)
            .map_err(store_error)?;
        self.load_new_measure(&key, dir_existed)
    }

    /// Load a freshly written measure. If it cannot be loaded back, the files
    /// that mark `dir` as a measure are removed so the request can be retried.
    fn load_new_measure(&mut self, key: &Path, dir_existed: bool) -> ManagerResult<Arc<MeasureMetadata>> {
        let err = match self.get_measure(key, true) {
            Ok(measure) => return Ok(measure),
            Err(e) => e,
        };
        warn!(measure_dir = %key.display(), error = %err, "new measure failed to load, removing it");
        let removed = if dir_existed {
            [MEASURE_XML, MEASURE_SCRIPT]
                .iter()
                .map(|name| key.join(name))
                .filter(|path| path.exists())
                .try_for_each(fs::remove_file)
        } else {
            fs::remove_dir_all(key)
        };
        if let Err(e) = removed {
            warn!(measure_dir = %key.display(), error = %e, "failed to remove new measure");
        }
        Err(err)
    }

    fn evict_model(&mut self, key: &Path) {
        if self.models.remove(key).is_some() {
            let purged = self.argument_info.purge_model(key);
            info!(osm_path = %key.display(), purged, "evicted model");
        }
    }

    fn evict_measure(&mut self, key: &Path) {
        let existed = self.measures.remove(key).is_some();
        let purged = self.argument_info.purge_measure(key);
        if existed || purged > 0 {
            info!(measure_dir = %key.display(), purged, "evicted measure");
        }
    }

    /// Cached models with their checksums, in path order.
    pub fn models(&self) -> impl Iterator<Item = (&Path, &Fingerprint)> {
        self.models
            .iter()
            .map(|(path, entry)| (path.as_path(), &entry.fingerprint))
    }

    /// Cached measures, in directory order.
    pub fn measures(&self) -> impl Iterator<Item = &Arc<MeasureMetadata>> {
        self.measures.iter().map(|(_, entry)| &entry.measure)
    }

    /// Cached argument-info rows, in key order.
    pub fn argument_infos(&self) -> impl Iterator<Item = (&ArgumentKey, &Arc<ArgumentInfo>)> {
        self.argument_info.iter()
    }

    /// Cached argument info for `measure_dir` without a model, if any.
    pub fn cached_argument_info(&self, measure_dir: &Path) -> Option<Arc<ArgumentInfo>> {
        self.argument_info
            .get(&ArgumentKey::new(measure_dir, None))
            .cloned()
    }

    pub fn has_model(&self, path: &Path) -> bool {
        self.models.contains(&cache_key(path))
    }

    pub fn has_measure(&self, dir: &Path) -> bool {
        self.measures.contains(&cache_key(dir))
    }

    pub fn has_argument_info(&self, measure_dir: &Path, model_path: Option<&Path>) -> bool {
        let model_key = model_path.map(cache_key);
        self.argument_info
            .contains(&ArgumentKey::new(&cache_key(measure_dir), model_key.as_deref()))
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn measure_count(&self) -> usize {
        self.measures.len()
    }

    pub fn argument_info_count(&self) -> usize {
        self.argument_info.len()
    }
}

fn store_error(err: LoadError) -> ManagerError {
    match err {
        LoadError::AlreadyExists(path) => ManagerError::AlreadyExists(path),
        other => ManagerError::Store(other),
    }
}
