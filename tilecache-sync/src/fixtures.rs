//! Store seeding helpers for unit tests.

use std::path::Path;

use tilecache_core::{
    Access, Fetch, LayerMode, LayerName, Schema, TileKey, TileRecord, TileStore, UpdatedAt,
};

pub(crate) const T0: &str = "2021-06-01 00:00:00";
pub(crate) const T1: &str = "2022-01-01 00:00:00";
pub(crate) const T2: &str = "2022-06-01 00:00:00";

pub(crate) fn layer(name: &str) -> LayerName {
    LayerName::new(name).unwrap()
}

pub(crate) fn seed(path: &Path, name: &str, records: &[(TileKey, &str, &[u8])]) {
    let mut store = TileStore::open(path, Access::ReadWrite).unwrap();
    let txn = store.transaction().unwrap();
    let target = txn
        .open_layer(Schema::Main, &layer(name), LayerMode::Write)
        .unwrap();
    for (key, updated, payload) in records {
        txn.upsert(
            &target,
            &TileRecord {
                key: *key,
                updated_at: UpdatedAt::from(*updated),
                payload: payload.to_vec(),
            },
        )
        .unwrap();
    }
    txn.commit().unwrap();
    store.close().unwrap();
}

pub(crate) fn fetch(path: &Path, name: &str, key: TileKey) -> Option<TileRecord> {
    let mut store = TileStore::open(path, Access::ReadOnly).unwrap();
    let txn = store.transaction().unwrap();
    let Ok(source) = txn.open_layer(Schema::Main, &layer(name), LayerMode::Read) else {
        return None;
    };
    match txn.get(&source, key).unwrap() {
        Fetch::One(record) => Some(record),
        Fetch::Missing => None,
        Fetch::Duplicate(n) => panic!("{n} records for {key}"),
    }
}
