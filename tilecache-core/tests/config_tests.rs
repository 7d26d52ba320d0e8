//! YAML run file loading.

use assert_fs::prelude::*;
use predicates::prelude::predicate;

use tilecache_core::{MergePolicy, SyncConfig, UsageError};

#[test]
fn run_file_defaults_policy_to_full() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("run.yaml");
    file.write_str(
        "source: /srv/src.db\n\
         destination: /srv/dst.db\n\
         layers:\n\
         \x20 - layer: osm\n\
         \x20 - layer: sat\n\
         \x20   policy: update_only\n",
    )
    .expect("write");
    file.assert(predicate::path::exists());

    let config = SyncConfig::load_at(file.path()).expect("load");
    assert_eq!(config.layers.len(), 2);
    assert_eq!(config.layers[0].layer.as_str(), "osm");
    assert_eq!(config.layers[0].policy, MergePolicy::Full);
    assert_eq!(config.layers[1].policy, MergePolicy::UpdateOnly);
}

#[test]
fn run_file_with_empty_layer_name_is_rejected() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("run.yaml");
    file.write_str("source: a.db\ndestination: b.db\nlayers:\n  - layer: \"\"\n")
        .expect("write");

    let err = SyncConfig::load_at(file.path()).unwrap_err();
    assert!(matches!(err, UsageError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("run.yaml"));
}

#[test]
fn missing_run_file_names_the_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = SyncConfig::load_at(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, UsageError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("absent.yaml"));
}
