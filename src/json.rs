//! JSON vector input for the CLI
//!
//! Input format: a JSON array of arrays, `[[0.1, ...], [0.2, ...]]`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;

/// Read a batch of vectors, checking they all share one length
pub fn read_vectors(path: &Path) -> anyhow::Result<Vec<Vec<f32>>> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let vectors: Vec<Vec<f32>> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {:?} as a JSON array of vectors", path))?;

    if let Some(first) = vectors.first() {
        let dim = first.len();
        if let Some((i, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dim) {
            anyhow::bail!("Vector {} has dimension {}, expected {}", i, v.len(), dim);
        }
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_vectors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.json");
        std::fs::write(&path, "[[1.0, 0.0], [0.5, 0.5]]").unwrap();

        let vectors = read_vectors(&path).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn test_read_vectors_ragged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.json");
        std::fs::write(&path, "[[1.0, 0.0], [0.5]]").unwrap();

        let err = read_vectors(&path).unwrap_err();
        assert!(err.to_string().contains("Vector 1 has dimension 1"));
    }
}
