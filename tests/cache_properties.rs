//! Cache Correctness Tests
//!
//! Fingerprinting, hit idempotence, invalidation cascade, drift self-heal,
//! and eviction, exercised through the coordinator with counting
//! collaborators over real files.

mod support;

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use mm_server::{Fingerprint, ManagerError, MeasureFingerprint, MeasureStore, XmlMeasureStore};

use support::{coordinator, create_measure_on_disk, edit_script, touch_script, write_model, Counters};

// =============================================================================
// Fingerprints
// =============================================================================

#[test]
fn test_fingerprint_is_stable_for_unchanged_content() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    create_measure_on_disk(&dir, "Add Overhang");
    let xml = dir.join("measure.xml");

    let first = MeasureFingerprint::compute(&dir, &xml).unwrap();
    let second = MeasureFingerprint::compute(&dir, &xml).unwrap();
    assert_eq!(first, second);
    assert!(!first.delta(&second).is_changed());
}

#[test]
fn test_fingerprint_parts_change_independently() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    create_measure_on_disk(&dir, "Add Overhang");
    let xml = dir.join("measure.xml");
    let before = MeasureFingerprint::compute(&dir, &xml).unwrap();

    edit_script(&dir, "# new body\n");
    let after_script = MeasureFingerprint::compute(&dir, &xml).unwrap();
    let delta = before.delta(&after_script);
    assert!(delta.scripts_changed);
    assert!(!delta.metadata_changed);

    let text = fs::read_to_string(&xml).unwrap();
    fs::write(&xml, text.replace("Add Overhang description", "Edited")).unwrap();
    let after_xml = MeasureFingerprint::compute(&dir, &xml).unwrap();
    let delta = after_script.delta(&after_xml);
    assert!(delta.metadata_changed);
    assert!(!delta.scripts_changed);
}

#[test]
fn test_file_fingerprint_tracks_content_not_name() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.osm");
    let b = temp.path().join("b.osm");
    write_model(&a, &["Space 1"]);
    write_model(&b, &["Space 1"]);

    assert_eq!(Fingerprint::from_file(&a).unwrap(), Fingerprint::from_file(&b).unwrap());
    write_model(&b, &["Space 2"]);
    assert_ne!(Fingerprint::from_file(&a).unwrap(), Fingerprint::from_file(&b).unwrap());
}

// =============================================================================
// Hit idempotence
// =============================================================================

#[test]
fn test_repeated_lookups_do_no_work() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    let osm = temp.path().join("x.osm");
    create_measure_on_disk(&dir, "Add Overhang");
    write_model(&osm, &["Space 1", "Space 2"]);

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);

    let measure = coord.get_measure(&dir, false).unwrap();
    let model = coord.get_model(&osm, false).unwrap();
    let first = coord.get_argument_info(&measure, Some(&model));

    let measure_again = coord.get_measure(&dir, false).unwrap();
    let model_again = coord.get_model(&osm, false).unwrap();
    let second = coord.get_argument_info(&measure_again, Some(&model_again));

    assert_eq!(counters.model_loads(), 1);
    assert_eq!(counters.translations(), 1);
    assert_eq!(counters.extractions(), 1);
    assert!(Arc::ptr_eq(&measure, &measure_again));
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.arguments.last().unwrap().choices.len(), 2);
}

#[test]
fn test_force_reload_bypasses_hit() {
    let temp = TempDir::new().unwrap();
    let osm = temp.path().join("x.osm");
    write_model(&osm, &["Space 1"]);

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    coord.get_model(&osm, false).unwrap();
    coord.get_model(&osm, true).unwrap();

    assert_eq!(counters.model_loads(), 2);
}

// =============================================================================
// Invalidation cascade
// =============================================================================

#[test]
fn test_model_reload_purges_only_its_rows() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    let x = temp.path().join("x.osm");
    let y = temp.path().join("y.osm");
    create_measure_on_disk(&dir, "Add Overhang");
    write_model(&x, &["Space 1"]);
    write_model(&y, &["Space 1"]);

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    let measure = coord.get_measure(&dir, false).unwrap();
    let mx = coord.get_model(&x, false).unwrap();
    let my = coord.get_model(&y, false).unwrap();
    coord.get_argument_info(&measure, None);
    coord.get_argument_info(&measure, Some(&mx));
    coord.get_argument_info(&measure, Some(&my));
    assert_eq!(coord.argument_info_count(), 3);

    write_model(&x, &["Space 1", "Space 2"]);
    let mx = coord.get_model(&x, false).unwrap();

    assert!(!coord.has_argument_info(&dir, Some(&x)));
    assert!(coord.has_argument_info(&dir, Some(&y)));
    assert!(coord.has_argument_info(&dir, None));

    let info = coord.get_argument_info(&measure, Some(&mx));
    assert_eq!(info.arguments.last().unwrap().choices.len(), 2);
    assert_eq!(counters.extractions(), 4);
}

#[test]
fn test_measure_reload_purges_all_its_rows() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    let x = temp.path().join("x.osm");
    create_measure_on_disk(&a, "Measure A");
    create_measure_on_disk(&b, "Measure B");
    write_model(&x, &["Space 1"]);

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    let model = coord.get_model(&x, false).unwrap();
    for dir in [&a, &b] {
        let measure = coord.get_measure(dir, false).unwrap();
        coord.get_argument_info(&measure, None);
        coord.get_argument_info(&measure, Some(&model));
    }
    assert_eq!(coord.argument_info_count(), 4);

    coord.get_measure(&a, true).unwrap();

    assert!(!coord.has_argument_info(&a, None));
    assert!(!coord.has_argument_info(&a, Some(&x)));
    assert!(coord.has_argument_info(&b, None));
    assert!(coord.has_argument_info(&b, Some(&x)));
}

// =============================================================================
// Drift self-heal
// =============================================================================

#[test]
fn test_script_edit_updates_once() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    create_measure_on_disk(&dir, "Add Overhang");

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    let original = coord.get_measure(&dir, false).unwrap();
    coord.get_argument_info(&original, None);
    assert_eq!(counters.extractions(), 1);

    edit_script(&dir, "# edited body\n");
    let updated = coord.get_measure(&dir, false).unwrap();
    assert_eq!(counters.extractions(), 2);
    assert_ne!(updated.version_id, original.version_id);
    assert!(!XmlMeasureStore.files_changed(&updated));

    // The update seeded the no-model row.
    coord.get_argument_info(&updated, None);
    let again = coord.get_measure(&dir, false).unwrap();
    coord.get_argument_info(&again, None);
    assert_eq!(counters.extractions(), 2);
    assert!(Arc::ptr_eq(&updated, &again));
}

#[test]
fn test_script_touch_updates_once() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    create_measure_on_disk(&dir, "Add Overhang");

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    let original = coord.get_measure(&dir, false).unwrap();

    touch_script(&dir);
    let updated = coord.get_measure(&dir, false).unwrap();
    assert_eq!(counters.extractions(), 1);
    assert_ne!(updated.version_id, original.version_id);

    for _ in 0..3 {
        let again = coord.get_measure(&dir, false).unwrap();
        assert!(Arc::ptr_eq(&updated, &again));
    }
    coord.get_argument_info(&updated, None);
    assert_eq!(counters.extractions(), 1);
}

#[test]
fn test_blank_output_fields_do_not_cause_repeat_updates() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    create_measure_on_disk(&dir, "Add Overhang");

    let counters = Arc::new(Counters::default());
    counters.report_blank_output(true);
    let mut coord = coordinator(&counters);
    coord.get_measure(&dir, false).unwrap();

    edit_script(&dir, "# edited body\n");
    let updated = coord.get_measure(&dir, false).unwrap();
    assert_eq!(updated.outputs[0].short_name, None);
    assert!(!XmlMeasureStore.xml_changed(&updated));

    for _ in 0..4 {
        coord.get_measure(&dir, false).unwrap();
    }
    assert_eq!(counters.extractions(), 1);
}

#[test]
fn test_hand_edited_metadata_is_repaired() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    create_measure_on_disk(&dir, "Add Overhang");
    let xml = dir.join("measure.xml");

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    coord.get_measure(&dir, false).unwrap();

    let text = fs::read_to_string(&xml).unwrap();
    fs::write(&xml, text.replace("Add Overhang description", "Hand edited")).unwrap();

    let updated = coord.get_measure(&dir, false).unwrap();
    assert_eq!(updated.description, "Hand edited");
    assert!(!XmlMeasureStore.xml_changed(&updated));
    assert_eq!(counters.extractions(), 1);
}

#[test]
fn test_failed_update_propagates_and_evicts() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    create_measure_on_disk(&dir, "Add Overhang");

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    let measure = coord.get_measure(&dir, false).unwrap();
    coord.get_argument_info(&measure, None);

    counters.fail_extractions(true);
    edit_script(&dir, "raise 'broken'\n");
    let err = coord.get_measure(&dir, false).unwrap_err();

    assert!(matches!(err, ManagerError::LoadFailure { .. }));
    assert!(!coord.has_measure(&dir));
    assert_eq!(coord.argument_info_count(), 0);

    counters.fail_extractions(false);
    coord.get_measure(&dir, false).unwrap();
    assert!(coord.has_measure(&dir));
}

#[test]
fn test_extractor_failure_is_cached_as_placeholder() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    let osm = temp.path().join("x.osm");
    create_measure_on_disk(&dir, "Add Overhang");
    write_model(&osm, &["Space 1"]);

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    let measure = coord.get_measure(&dir, false).unwrap();
    let model = coord.get_model(&osm, false).unwrap();

    counters.fail_extractions(true);
    let info = coord.get_argument_info(&measure, Some(&model));
    assert!(info.error.as_deref().unwrap().contains("undefined method"));
    assert!(info.arguments.is_empty());

    counters.fail_extractions(false);
    let cached = coord.get_argument_info(&measure, Some(&model));
    assert!(Arc::ptr_eq(&info, &cached));
    assert_eq!(counters.extractions(), 1);
}

#[test]
fn test_translation_failure_leaves_workspace_absent() {
    let temp = TempDir::new().unwrap();
    let osm = temp.path().join("x.osm");
    write_model(&osm, &["Space 1"]);

    let counters = Arc::new(Counters::default());
    counters.fail_translations(true);
    let mut coord = coordinator(&counters);

    let model = coord.get_model(&osm, false).unwrap();
    assert!(model.workspace.is_none());
    assert!(coord.has_model(&osm));
}

// =============================================================================
// Eviction
// =============================================================================

#[test]
fn test_deleted_model_is_evicted_with_its_rows() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    let osm = temp.path().join("x.osm");
    create_measure_on_disk(&dir, "Add Overhang");
    write_model(&osm, &["Space 1"]);

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    let measure = coord.get_measure(&dir, false).unwrap();
    let model = coord.get_model(&osm, false).unwrap();
    coord.get_argument_info(&measure, Some(&model));
    coord.get_argument_info(&measure, None);

    fs::remove_file(&osm).unwrap();
    let err = coord.get_model(&osm, false).unwrap_err();

    assert!(matches!(err, ManagerError::ModelNotFound(_)));
    assert!(!coord.has_model(&osm));
    assert!(!coord.has_argument_info(&dir, Some(&osm)));
    assert!(coord.has_argument_info(&dir, None));
}

#[test]
fn test_deleted_metadata_evicts_measure() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("m");
    create_measure_on_disk(&dir, "Add Overhang");

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);
    let measure = coord.get_measure(&dir, false).unwrap();
    coord.get_argument_info(&measure, None);

    fs::remove_file(dir.join("measure.xml")).unwrap();
    let err = coord.get_measure(&dir, false).unwrap_err();

    assert!(matches!(err, ManagerError::MeasureNotFound(_)));
    assert!(!coord.has_measure(&dir));
    assert_eq!(coord.argument_info_count(), 0);
}

#[test]
fn test_unloadable_model_is_never_cached() {
    let temp = TempDir::new().unwrap();
    let osm = temp.path().join("x.osm");
    fs::write(&osm, "OS:Space, {handle}, Space 1").unwrap();

    let counters = Arc::new(Counters::default());
    let mut coord = coordinator(&counters);

    assert!(coord.get_model(&osm, false).is_err());
    assert!(coord.get_model(&osm, false).is_err());
    assert_eq!(counters.model_loads(), 2);
    assert_eq!(coord.model_count(), 0);
}
