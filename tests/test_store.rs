use assert_fs::prelude::*;
use predicates::prelude::*;

use vismatch::core::store::{FeatureRecord, FeatureStore};
use vismatch::AppError;

fn record(product_id: u64, vector: Vec<f32>) -> FeatureRecord {
    FeatureRecord { product_id, vector }
}

#[test]
fn test_round_trip_preserves_order_and_values() {
    let root = assert_fs::TempDir::new().unwrap();
    let artifact = root.child("features.bin");

    // Ids deliberately out of numeric order; the store must not reorder.
    let store = FeatureStore::build(vec![
        record(30, vec![0.25, -1.5, 3.0]),
        record(7, vec![0.0, 0.0, 1.0]),
        record(19, vec![1.0, 2.0, 4.0]),
    ])
    .unwrap();
    store.save(artifact.path()).unwrap();
    artifact.assert(predicate::path::is_file());

    let loaded = FeatureStore::load(artifact.path()).unwrap();
    assert_eq!(loaded.dimension(), 3);
    assert_eq!(loaded.len(), 3);

    let pairs: Vec<(u64, Vec<f32>)> = loaded.iter().map(|(id, v)| (id, v.to_vec())).collect();
    assert_eq!(
        pairs,
        vec![
            (30, vec![0.25, -1.5, 3.0]),
            (7, vec![0.0, 0.0, 1.0]),
            (19, vec![1.0, 2.0, 4.0]),
        ]
    );
}

#[test]
fn test_save_replaces_previous_artifact_wholesale() {
    let root = assert_fs::TempDir::new().unwrap();
    let artifact = root.child("features.bin");

    let first = FeatureStore::build(vec![record(1, vec![1.0]), record(2, vec![2.0])]).unwrap();
    first.save(artifact.path()).unwrap();

    let second = FeatureStore::build(vec![record(9, vec![0.5])]).unwrap();
    second.save(artifact.path()).unwrap();

    let loaded = FeatureStore::load(artifact.path()).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.iter().next().unwrap().0, 9);

    // The temp file used for the atomic write must not linger.
    let leftovers = std::fs::read_dir(root.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .count();
    assert_eq!(leftovers, 1);
}

#[test]
fn test_missing_artifact_fails_to_load() {
    let root = assert_fs::TempDir::new().unwrap();
    let err = FeatureStore::load(root.child("features.bin").path()).unwrap_err();
    assert!(matches!(err, AppError::CorruptStore(_)));
}

#[test]
fn test_garbage_artifact_fails_to_load() {
    let root = assert_fs::TempDir::new().unwrap();
    let artifact = root.child("features.bin");
    artifact.write_binary(b"\x00\x01\x02 not a store").unwrap();

    let err = FeatureStore::load(artifact.path()).unwrap_err();
    assert!(matches!(err, AppError::CorruptStore(_)));
}

#[test]
fn test_truncated_artifact_fails_to_load() {
    let root = assert_fs::TempDir::new().unwrap();
    let artifact = root.child("features.bin");

    let store = FeatureStore::build(vec![
        record(1, vec![1.0, 2.0, 3.0, 4.0]),
        record(2, vec![5.0, 6.0, 7.0, 8.0]),
    ])
    .unwrap();
    store.save(artifact.path()).unwrap();

    // Chop the tail off; the decoder must refuse, never misalign.
    let bytes = std::fs::read(artifact.path()).unwrap();
    artifact.write_binary(&bytes[..bytes.len() / 2]).unwrap();

    let err = FeatureStore::load(artifact.path()).unwrap_err();
    assert!(matches!(err, AppError::CorruptStore(_)));
}
