use std::path::Path;

use tilecache_core::{
    Access, Fetch, LayerJob, LayerMode, LayerName, MergePolicy, Schema, SyncConfig, TileKey,
    TileRecord, TileStore, UpdatedAt,
};

pub const OLDER: &str = "2021-06-01 00:00:00";
pub const NEWER: &str = "2022-01-01 00:00:00";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn layer(name: &str) -> LayerName {
    LayerName::new(name).expect("layer name")
}

pub fn job(name: &str, policy: MergePolicy) -> LayerJob {
    LayerJob {
        layer: layer(name),
        policy,
    }
}

pub fn config(dir: &Path, jobs: Vec<LayerJob>) -> SyncConfig {
    SyncConfig {
        source: dir.join("src.db"),
        destination: dir.join("dst.db"),
        layers: jobs,
    }
}

pub fn seed(path: &Path, name: &str, records: &[(TileKey, &str, &[u8])]) {
    let mut store = TileStore::open(path, Access::ReadWrite).expect("open store");
    let txn = store.transaction().expect("begin");
    let target = txn
        .open_layer(Schema::Main, &layer(name), LayerMode::Write)
        .expect("open layer");
    for (key, updated, payload) in records {
        txn.upsert(
            &target,
            &TileRecord {
                key: *key,
                updated_at: UpdatedAt::from(*updated),
                payload: payload.to_vec(),
            },
        )
        .expect("upsert");
    }
    txn.commit().expect("commit");
    store.close().expect("close");
}

pub fn fetch(path: &Path, name: &str, key: TileKey) -> Option<TileRecord> {
    let mut store = TileStore::open(path, Access::ReadOnly).expect("open store");
    let txn = store.transaction().expect("begin");
    let source = txn
        .open_layer(Schema::Main, &layer(name), LayerMode::Read)
        .ok()?;
    match txn.get(&source, key).expect("get") {
        Fetch::One(record) => Some(record),
        Fetch::Missing => None,
        Fetch::Duplicate(n) => panic!("{n} records for {key}"),
    }
}

pub fn count(path: &Path, name: &str) -> u64 {
    let mut store = TileStore::open(path, Access::ReadOnly).expect("open store");
    let txn = store.transaction().expect("begin");
    let source = txn
        .open_layer(Schema::Main, &layer(name), LayerMode::Read)
        .expect("open layer");
    txn.count(&source).expect("count")
}
