//! Readers-writer wrapper for sharing one index across threads
//!
//! Searches take the read lock and run in parallel; anything that mutates
//! memory or touches the backing file takes the write lock, so at most one
//! writer ever holds the file.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::flat::SearchHits;
use crate::index::{Distribution, OpenOptions, SimilarityIndex};

#[derive(Clone, Debug)]
pub struct SharedIndex {
    inner: Arc<RwLock<SimilarityIndex>>,
}

impl SharedIndex {
    pub fn new(index: SimilarityIndex) -> Self {
        Self {
            inner: Arc::new(RwLock::new(index)),
        }
    }

    /// [`SimilarityIndex::open_with`], wrapped for sharing
    pub fn open_with<P: AsRef<Path>>(path: P, dim: usize, options: OpenOptions) -> Result<Self> {
        SimilarityIndex::open_with(path, dim, options).map(Self::new)
    }

    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchHits> {
        self.inner.read().search(query, k)
    }

    pub fn probability_distribution(&self, query: &[f32], k: usize) -> Result<Distribution> {
        self.inner.read().probability_distribution(query, k)
    }

    pub fn add<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Result<Range<usize>> {
        self.inner.write().add(vectors)
    }

    pub fn append<V: AsRef<[f32]>>(&self, vectors: &[V]) -> Result<Range<usize>> {
        self.inner.write().append(vectors)
    }

    pub fn persist(&self) -> Result<()> {
        self.inner.write().persist()
    }

    /// Delete the backing file. The vectors stay in memory and the next
    /// persist writes the file again.
    pub fn remove_storage(&self) -> Result<bool> {
        let guard = self.inner.write();
        SimilarityIndex::remove(guard.path())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn dim(&self) -> usize {
        self.inner.read().dim()
    }

    pub fn path(&self) -> PathBuf {
        self.inner.read().path().to_path_buf()
    }

    /// Run `f` under the read lock
    pub fn read<R>(&self, f: impl FnOnce(&SimilarityIndex) -> R) -> R {
        f(&self.inner.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_concurrent_readers_and_writer() {
        let dir = tempdir().unwrap();
        let shared =
            SharedIndex::open_with(dir.path().join("idx.nsx"), 2, OpenOptions::default()).unwrap();
        shared.add(&[[1.0f32, 0.0]]).unwrap();

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    shared.append(&[[0.0f32, i as f32]]).unwrap();
                }
                shared.persist().unwrap();
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let hits = shared.search(&[1.0, 0.0], 1).unwrap();
                        assert_eq!(hits.ids, vec![0]);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }

        assert_eq!(shared.len(), 51);
        assert!(!shared.read(|index| index.is_dirty()));
    }

    #[test]
    fn test_remove_storage_then_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx.nsx");
        let shared = SharedIndex::open_with(&path, 2, OpenOptions::default()).unwrap();
        shared.add(&[[1.0f32, 1.0]]).unwrap();

        assert!(shared.remove_storage().unwrap());
        assert!(!path.exists());
        assert_eq!(shared.len(), 1);

        shared.persist().unwrap();
        assert!(path.exists());
    }
}
