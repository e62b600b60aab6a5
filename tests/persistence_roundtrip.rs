use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use nearsight::format;
use nearsight::{OpenMode, OpenOptions, SimilarityIndex};

const DIM: usize = 16;

fn random_vectors(seed: u64, n: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..DIM).map(|_| rng.gen::<f32>() * 2.0 - 1.0).collect())
        .collect()
}

#[test]
fn persist_then_open_restores_vectors_bit_exact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("roundtrip.nsx");
    let vectors = random_vectors(7, 200);

    {
        let mut index = SimilarityIndex::open(&path, DIM).unwrap();
        index.add(&vectors[..50]).unwrap();
        index.append(&vectors[50..]).unwrap();
        index.persist().unwrap();
    }

    let reopened = SimilarityIndex::open(&path, DIM).unwrap();
    assert_eq!(reopened.dim(), DIM);
    assert_eq!(reopened.len(), vectors.len());
    for (id, expected) in vectors.iter().enumerate() {
        let stored = reopened.vectors().get(id).unwrap();
        let a: Vec<u32> = stored.iter().map(|f| f.to_bits()).collect();
        let b: Vec<u32> = expected.iter().map(|f| f.to_bits()).collect();
        assert_eq!(a, b, "vector {id} changed across persist/open");
    }
}

#[test]
fn reopened_index_answers_like_the_original() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("answers.nsx");
    let vectors = random_vectors(11, 64);
    let queries = random_vectors(12, 8);

    let mut index = SimilarityIndex::open(&path, DIM).unwrap();
    index.add(&vectors).unwrap();
    let before: Vec<_> = queries.iter().map(|q| index.search(q, 5).unwrap()).collect();
    drop(index);

    let opts = OpenOptions::new().mode(OpenMode::LoadExisting);
    let reopened = SimilarityIndex::open_with(&path, DIM, opts).unwrap();
    for (q, expected) in queries.iter().zip(&before) {
        assert_eq!(&reopened.search(q, 5).unwrap(), expected);
    }
}

#[test]
fn ids_continue_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ids.nsx");

    let mut index = SimilarityIndex::open(&path, 2).unwrap();
    index.add(&[[1.0f32, 0.0], [0.0, 1.0]]).unwrap();
    drop(index);

    let mut index = SimilarityIndex::open(&path, 2).unwrap();
    assert_eq!(index.add(&[[0.6f32, 0.8]]).unwrap(), 2..3);

    let hits = index.search(&[0.6, 0.8], 1).unwrap();
    assert_eq!(hits.ids, vec![2]);
}

#[test]
fn missing_path_creates_usable_persisted_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("new.nsx");
    assert!(!path.exists());

    let mut index = SimilarityIndex::open(&path, 4).unwrap();
    assert!(path.exists());
    let on_disk = format::read_index(&path).unwrap();
    assert_eq!((on_disk.dim, on_disk.count), (4, 0));

    index.add(&[[0.0f32, 0.0, 0.0, 1.0]]).unwrap();
    let hits = index.search(&[0.0, 0.0, 0.0, 1.0], 3).unwrap();
    assert_eq!(hits.ids, vec![0]);
    assert_eq!(hits.scores, vec![1.0]);
}

#[test]
fn no_temp_file_left_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clean.nsx");

    let mut index = SimilarityIndex::open(&path, 3).unwrap();
    for i in 0..5 {
        index.add(&[[i as f32, 1.0, 0.0]]).unwrap();
    }

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["clean.nsx".to_string()]);
}
