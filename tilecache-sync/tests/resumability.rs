//! Whole-run behaviour across repeated and interrupted runs.

mod common;

use rusqlite::Connection;
use tempfile::TempDir;
use tilecache_core::{LayerName, MergePolicy, TileKey};
use tilecache_sync::{run, MergePlan, NoopObserver, RunPhase, SyncError, SyncObserver};

use common::{config, count, fetch, init_logging, job, seed, NEWER, OLDER};

#[derive(Default)]
struct Recording {
    phases: Vec<RunPhase>,
    planned: Vec<(String, usize)>,
    progress: Vec<(String, u8)>,
}

impl SyncObserver for Recording {
    fn phase(&mut self, phase: &RunPhase) {
        self.phases.push(phase.clone());
    }

    fn planned(&mut self, plan: &MergePlan) {
        self.planned.push((plan.layer().to_string(), plan.len()));
    }

    fn progress(&mut self, layer: &LayerName, percent: u8) {
        self.progress.push((layer.to_string(), percent));
    }
}

fn grid(zoom: i64, side: i64) -> Vec<TileKey> {
    (0..side)
        .flat_map(|x| (0..side).map(move |y| TileKey::new(x, y, zoom)))
        .collect()
}

#[test]
fn second_run_plans_nothing() {
    init_logging();
    let tmp = TempDir::new().expect("tempdir");
    let cfg = config(tmp.path(), vec![job("osm", MergePolicy::Full)]);
    let keys = grid(3, 4);
    let records: Vec<_> = keys.iter().map(|k| (*k, NEWER, &b"png"[..])).collect();
    seed(&cfg.source, "osm", &records);

    let first = run(&cfg, &mut NoopObserver).expect("first run");
    assert_eq!(first.copied(), 16);
    assert_eq!(first.layers[0].new_tiles, 16);

    let mut observer = Recording::default();
    let second = run(&cfg, &mut observer).expect("second run");
    assert_eq!(second.copied(), 0);
    assert_eq!(observer.planned, vec![("osm".to_string(), 0)]);
    assert!(observer.progress.is_empty());
    assert_eq!(count(&cfg.destination, "osm"), 16);
}

#[test]
fn interrupted_run_keeps_committed_layers_and_converges() {
    init_logging();
    let tmp = TempDir::new().expect("tempdir");
    let cfg = config(
        tmp.path(),
        vec![job("alpha", MergePolicy::Full), job("beta", MergePolicy::Full)],
    );
    let key = TileKey::new(1, 1, 2);
    seed(&cfg.source, "alpha", &[(key, NEWER, b"a")]);
    {
        let conn = Connection::open(&cfg.source).expect("open source");
        conn.execute_batch(
            "CREATE TABLE T_beta (x INTEGER, y INTEGER, zoom INTEGER, updatedAt TEXT, payload BLOB);
             INSERT INTO T_beta VALUES (1, 1, 2, '2022-01-01 00:00:00', x'01');
             INSERT INTO T_beta VALUES (1, 1, 2, '2022-01-01 00:00:00', x'02');",
        )
        .expect("seed beta");
    }

    let mut observer = Recording::default();
    let err = run(&cfg, &mut observer).expect_err("beta must fail");
    assert!(
        matches!(err, SyncError::Consistency { rows: 2, .. }),
        "got: {err}"
    );
    assert!(err.is_fault());
    assert!(observer
        .phases
        .contains(&RunPhase::Committed(common::layer("alpha"))));
    assert_eq!(observer.phases.last(), Some(&RunPhase::Aborted));
    assert!(fetch(&cfg.destination, "alpha", key).is_some());
    assert!(fetch(&cfg.destination, "beta", key).is_none());

    {
        let conn = Connection::open(&cfg.source).expect("open source");
        conn.execute("DELETE FROM T_beta WHERE payload = x'02'", [])
            .expect("repair beta");
    }

    let report = run(&cfg, &mut NoopObserver).expect("rerun");
    assert_eq!(report.layers[0].copied, 0);
    assert_eq!(report.layers[1].copied, 1);
    let beta = fetch(&cfg.destination, "beta", key).expect("beta copied");
    assert_eq!(beta.payload, vec![0x01]);
}

#[test]
fn progress_is_monotonic_and_ends_at_hundred() {
    init_logging();
    let tmp = TempDir::new().expect("tempdir");
    let cfg = config(tmp.path(), vec![job("osm", MergePolicy::Full)]);
    let keys = grid(8, 15);
    let records: Vec<_> = keys.iter().map(|k| (*k, NEWER, &b"png"[..])).collect();
    seed(&cfg.source, "osm", &records);

    let mut observer = Recording::default();
    run(&cfg, &mut observer).expect("run");

    let values: Vec<u8> = observer.progress.iter().map(|(_, p)| *p).collect();
    assert!(values.windows(2).all(|w| w[0] < w[1]), "{values:?}");
    assert_eq!(values.first(), Some(&1));
    assert_eq!(values.last(), Some(&100));
}

#[test]
fn update_only_without_destination_layer_aborts_run() {
    init_logging();
    let tmp = TempDir::new().expect("tempdir");
    let cfg = config(
        tmp.path(),
        vec![
            job("sat", MergePolicy::UpdateOnly),
            job("osm", MergePolicy::Full),
        ],
    );
    let key = TileKey::new(0, 0, 0);
    seed(&cfg.source, "sat", &[(key, NEWER, b"s")]);
    seed(&cfg.source, "osm", &[(key, NEWER, b"o")]);
    seed(&cfg.destination, "unrelated", &[]);

    let err = run(&cfg, &mut NoopObserver).expect_err("schema fault");
    assert!(matches!(err, SyncError::Schema { .. }), "got: {err}");
    assert!(fetch(&cfg.destination, "osm", key).is_none());
}

#[test]
fn newer_destination_tiles_are_left_alone() {
    init_logging();
    let tmp = TempDir::new().expect("tempdir");
    let cfg = config(tmp.path(), vec![job("osm", MergePolicy::UpdateOnly)]);
    let key = TileKey::new(4, 4, 4);
    seed(&cfg.source, "osm", &[(key, OLDER, b"stale")]);
    seed(&cfg.destination, "osm", &[(key, NEWER, b"fresh")]);

    let report = run(&cfg, &mut NoopObserver).expect("run");
    assert_eq!(report.copied(), 0);
    let kept = fetch(&cfg.destination, "osm", key).expect("kept");
    assert_eq!(kept.payload, b"fresh");
}

#[test]
fn update_only_second_run_plans_nothing() {
    init_logging();
    let tmp = TempDir::new().expect("tempdir");
    let cfg = config(tmp.path(), vec![job("osm", MergePolicy::UpdateOnly)]);
    let placeholder = TileKey::new(2, 1, 2);
    let unknown = TileKey::new(3, 1, 2);
    seed(
        &cfg.source,
        "osm",
        &[(placeholder, OLDER, b"png"), (unknown, NEWER, b"png")],
    );
    seed(&cfg.destination, "osm", &[(placeholder, NEWER, b"")]);

    let first = run(&cfg, &mut NoopObserver).expect("first run");
    assert_eq!(first.copied(), 1);

    let mut observer = Recording::default();
    let second = run(&cfg, &mut observer).expect("second run");
    assert_eq!(second.copied(), 0);
    assert_eq!(observer.planned, vec![("osm".to_string(), 0)]);
    assert!(fetch(&cfg.destination, "osm", unknown).is_none());
    assert_eq!(count(&cfg.destination, "osm"), 1);
}

#[test]
fn layer_name_case_differs_from_stored_table() {
    init_logging();
    let tmp = TempDir::new().expect("tempdir");
    let cfg = config(tmp.path(), vec![job("OSM", MergePolicy::Full)]);
    let key = TileKey::new(0, 0, 0);
    seed(&cfg.source, "osm", &[(key, NEWER, b"png")]);

    let report = run(&cfg, &mut NoopObserver).expect("run");
    assert_eq!(report.copied(), 1);
    assert!(fetch(&cfg.destination, "osm", key).is_some());
}
