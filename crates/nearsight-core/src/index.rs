//! Persisted similarity index
//!
//! [`SimilarityIndex`] pairs a [`FlatIndex`] with the .nsx file that backs it.
//! Opening is load-or-create by default: a missing file produces a fresh
//! empty index that is written out immediately, and a damaged file is
//! replaced the same way under [`RecoveryPolicy::RecreateOnCorruption`].
//!
//! The file is only ever written by [`SimilarityIndex::persist`], which
//! replaces it atomically (temp file + rename).

use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::{IndexError, Result};
use crate::flat::{FlatIndex, SearchHits};
use crate::format::{self, FormatError};
use crate::softmax::softmax_with_temperature;

/// How [`SimilarityIndex::open_with`] treats the backing file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Load the file, or create and persist an empty index if it is absent
    #[default]
    LoadOrCreate,
    /// Discard any existing file and start empty
    Overwrite,
    /// Load the file; a missing file is `NotFound`
    LoadExisting,
}

/// What to do when the backing file exists but does not decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Log the loss and replace the file with an empty index
    #[default]
    RecreateOnCorruption,
    /// Surface `IndexError::Corrupt`
    Fail,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub mode: OpenMode,
    pub recovery: RecoveryPolicy,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }
}

/// Search result converted into a confidence distribution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    pub probabilities: Vec<f32>,
    pub ids: Vec<usize>,
}

impl Distribution {
    /// Softmax over the scores of `hits`, keeping their ids and order
    pub fn from_hits(hits: SearchHits, temperature: f32) -> Result<Self> {
        Ok(Self {
            probabilities: softmax_with_temperature(&hits.scores, temperature)?,
            ids: hits.ids,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `(id, probability)` pairs, most likely first
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.ids.iter().copied().zip(self.probabilities.iter().copied())
    }
}

/// Outcome of reading the backing file
enum Loaded {
    Index(SimilarityIndex),
    Missing,
    /// Unreadable, and the recovery policy allows starting over
    Corrupt,
}

/// Inner-product index backed by a .nsx file
#[derive(Debug)]
pub struct SimilarityIndex {
    index: FlatIndex,
    path: PathBuf,
    options: OpenOptions,
    dirty: bool,
}

impl SimilarityIndex {
    /// Load the index at `path`, creating an empty `dim`-dimensional one if
    /// there is none. Damaged files are recreated empty.
    pub fn open<P: AsRef<Path>>(path: P, dim: usize) -> Result<Self> {
        Self::open_with(path, dim, OpenOptions::default())
    }

    /// Replace whatever is at `path` with an empty, persisted index
    pub fn create<P: AsRef<Path>>(path: P, dim: usize) -> Result<Self> {
        Self::open_with(path, dim, OpenOptions::new().mode(OpenMode::Overwrite))
    }

    pub fn open_with<P: AsRef<Path>>(path: P, dim: usize, options: OpenOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // Validate before touching the file system
        let empty = FlatIndex::new(dim)?;

        match options.mode {
            OpenMode::Overwrite => {
                Self::remove(&path)?;
                Self::create_empty(path, empty, options)
            }
            OpenMode::LoadExisting => match Self::load(&path, dim, options)? {
                Loaded::Index(index) => Ok(index),
                Loaded::Missing => Err(IndexError::NotFound { path }),
                Loaded::Corrupt => Self::create_empty(path, empty, options),
            },
            OpenMode::LoadOrCreate => match Self::load(&path, dim, options)? {
                Loaded::Index(index) => Ok(index),
                Loaded::Missing => {
                    tracing::info!("No index at {:?}, creating a new one", path);
                    Self::create_empty(path, empty, options)
                }
                Loaded::Corrupt => Self::create_empty(path, empty, options),
            },
        }
    }

    /// Delete the backing file at `path`.
    ///
    /// Returns `false` when there was nothing to delete.
    pub fn remove<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => {
                tracing::info!("Index removed from {:?}", path);
                Ok(true)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No index at {:?}, nothing to remove", path);
                Ok(false)
            }
            Err(err) => Err(IndexError::storage(path, err)),
        }
    }

    fn load(path: &Path, dim: usize, options: OpenOptions) -> Result<Loaded> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Loaded::Missing),
            Err(err) => return Err(IndexError::storage(path, err)),
        };

        let decoded = match format::decode(&bytes) {
            Ok(decoded) => decoded,
            Err(err) => return Self::recover(path, err, options.recovery),
        };

        if decoded.dim != dim {
            tracing::warn!(
                "Index at {:?} stores dimension {}, caller asked for {}; using the stored dimension",
                path,
                decoded.dim,
                dim
            );
        }

        let index = FlatIndex::from_parts(decoded.dim, decoded.data)?;
        tracing::info!(
            "Index loaded from {:?}: {} vectors of dimension {}",
            path,
            index.len(),
            index.dim()
        );
        Ok(Loaded::Index(Self {
            index,
            path: path.to_path_buf(),
            options,
            dirty: false,
        }))
    }

    fn recover(path: &Path, err: FormatError, policy: RecoveryPolicy) -> Result<Loaded> {
        match policy {
            RecoveryPolicy::RecreateOnCorruption => {
                tracing::warn!(
                    "Index at {:?} is unreadable ({}); its contents are lost, recreating it empty",
                    path,
                    err
                );
                Ok(Loaded::Corrupt)
            }
            RecoveryPolicy::Fail => Err(IndexError::Corrupt {
                path: path.to_path_buf(),
                source: err,
            }),
        }
    }

    fn create_empty(path: PathBuf, index: FlatIndex, options: OpenOptions) -> Result<Self> {
        let mut this = Self {
            index,
            path,
            options,
            dirty: true,
        };
        this.persist()?;
        tracing::info!(
            "Index created at {:?} with dimension {}",
            this.path,
            this.index.dim()
        );
        Ok(this)
    }

    /// Append `vectors` and persist the whole index.
    ///
    /// All-or-nothing: if validation or the save fails, memory is rolled back
    /// and the ids are not consumed. Each call rewrites the file; use
    /// [`append`](Self::append) plus one [`persist`](Self::persist) for bulk
    /// loads.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<Range<usize>> {
        let was_dirty = self.dirty;
        let ids = self.append(vectors)?;
        if let Err(err) = self.persist() {
            self.index.truncate(ids.start);
            self.dirty = was_dirty;
            return Err(err);
        }
        tracing::debug!("Added {} vectors to {:?}", ids.len(), self.path);
        Ok(ids)
    }

    /// Append `vectors` in memory only. The file is stale until the next
    /// [`persist`](Self::persist).
    pub fn append<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<Range<usize>> {
        let ids = self.index.add(vectors)?;
        if !ids.is_empty() {
            self.dirty = true;
        }
        Ok(ids)
    }

    /// Write every vector and the dimension to the backing file, replacing
    /// it atomically.
    pub fn persist(&mut self) -> Result<()> {
        format::write_index(&self.path, self.index.dim(), self.index.as_slice()).map_err(
            |err| match err {
                FormatError::Io(io) => IndexError::storage(&self.path, io),
                other => IndexError::storage(
                    &self.path,
                    io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
                ),
            },
        )?;
        self.dirty = false;
        tracing::debug!(
            "Index saved to {:?} ({} vectors)",
            self.path,
            self.index.len()
        );
        Ok(())
    }

    /// Exact top-`k` search; see [`FlatIndex::search`]
    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchHits> {
        self.index.search(query, k)
    }

    /// Top-`k` neighbors of `query` with softmax confidences
    pub fn probability_distribution(&self, query: &[f32], k: usize) -> Result<Distribution> {
        self.probability_distribution_with_temperature(query, k, 1.0)
    }

    pub fn probability_distribution_with_temperature(
        &self,
        query: &[f32],
        k: usize,
        temperature: f32,
    ) -> Result<Distribution> {
        let hits = self.search(query, k)?;
        if hits.is_empty() {
            return Ok(Distribution::default());
        }
        Distribution::from_hits(hits, temperature)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> OpenOptions {
        self.options
    }

    pub fn dim(&self) -> usize {
        self.index.dim()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Whether memory holds vectors the file does not
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The in-memory vectors
    pub fn vectors(&self) -> &FlatIndex {
        &self.index
    }
}
