use std::path::Path;

use tempfile::tempdir;

use nearsight::format::{self, HEADER_SIZE};
use nearsight::{IndexError, OpenMode, OpenOptions, RecoveryPolicy, SimilarityIndex};

fn seeded_index(path: &Path) {
    let mut index = SimilarityIndex::open(path, 3).unwrap();
    index
        .add(&[[1.0f32, 0.0, 0.0], [0.0, 1.0, 0.0]])
        .unwrap();
}

#[test]
fn garbage_file_is_recreated_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.nsx");
    std::fs::write(&path, b"definitely not an index").unwrap();

    let mut index = SimilarityIndex::open(&path, 3).unwrap();
    assert!(index.is_empty());
    assert_eq!(index.dim(), 3);

    // The corrupt file has already been replaced by a valid empty one
    let on_disk = format::read_index(&path).unwrap();
    assert_eq!((on_disk.dim, on_disk.count), (3, 0));

    index.add(&[[0.0f32, 0.0, 1.0]]).unwrap();
    assert_eq!(SimilarityIndex::open(&path, 3).unwrap().len(), 1);
}

#[test]
fn bit_flip_is_detected_and_recovered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flipped.nsx");
    seeded_index(&path);

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[HEADER_SIZE + 2] ^= 0x40;
    std::fs::write(&path, &bytes).unwrap();

    let index = SimilarityIndex::open(&path, 3).unwrap();
    assert!(index.is_empty());
}

#[test]
fn truncated_file_is_recovered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("torn.nsx");
    seeded_index(&path);

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let index = SimilarityIndex::open(&path, 3).unwrap();
    assert!(index.is_empty());
}

#[test]
fn strict_policy_surfaces_corruption() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("strict.nsx");
    std::fs::write(&path, b"NSIDX001 but nothing else").unwrap();
    let before = std::fs::read(&path).unwrap();

    let opts = OpenOptions::new().recovery(RecoveryPolicy::Fail);
    let result = SimilarityIndex::open_with(&path, 3, opts);
    assert!(matches!(result, Err(IndexError::Corrupt { .. })));

    // Nothing was overwritten
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn load_existing_still_recovers_corrupt_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("existing.nsx");
    std::fs::write(&path, [0u8; 100]).unwrap();

    let opts = OpenOptions::new().mode(OpenMode::LoadExisting);
    let index = SimilarityIndex::open_with(&path, 5, opts).unwrap();
    assert!(index.is_empty());
    assert_eq!(index.dim(), 5);
}

#[test]
fn intact_file_loads_under_both_policies() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fine.nsx");
    seeded_index(&path);

    for policy in [RecoveryPolicy::RecreateOnCorruption, RecoveryPolicy::Fail] {
        let opts = OpenOptions::new().recovery(policy);
        let index = SimilarityIndex::open_with(&path, 3, opts).unwrap();
        assert_eq!(index.len(), 2);
    }
}
