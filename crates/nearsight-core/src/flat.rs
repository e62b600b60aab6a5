//! Exact inner-product index over a contiguous row buffer
//!
//! Vectors live back to back in one `Vec<f32>`; a vector's id is its row
//! position, assigned in insertion order and never reused.
//!
//! Search is a brute-force scan: one dot product per stored row, with the best
//! `k` kept in a bounded min-heap. Results are sorted by descending score, and
//! equal scores rank the lower id first so output is deterministic.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::ops::Range;

use crate::error::{IndexError, Result};
use crate::simd::dot_product;

/// In-memory inner-product index of fixed dimension
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

/// Top-k result: parallel score and id columns, best first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub scores: Vec<f32>,
    pub ids: Vec<usize>,
}

impl SearchHits {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `(id, score)` pairs in rank order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.ids.iter().copied().zip(self.scores.iter().copied())
    }
}

/// Candidate ordered by rank: greater means better
#[derive(Clone, Copy, Debug)]
struct Hit {
    id: usize,
    score: f32,
}

impl Ord for Hit {
    fn cmp(&self, other: &Self) -> Ordering {
        // NaN ranks below every real score
        (!self.score.is_nan())
            .cmp(&!other.score.is_nan())
            .then_with(|| {
                self.score
                    .partial_cmp(&other.score)
                    .unwrap_or(Ordering::Equal)
            })
            // Ties: lower id wins
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Hit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Hit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Hit {}

impl FlatIndex {
    /// Create an empty index for `dim`-dimensional vectors
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(IndexError::ZeroDimension);
        }
        Ok(Self {
            dim,
            data: Vec::new(),
        })
    }

    /// Rebuild an index from a row-major buffer of `dim`-float rows
    pub fn from_parts(dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 {
            return Err(IndexError::ZeroDimension);
        }
        if data.len() % dim != 0 {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: data.len() % dim,
                position: data.len() / dim,
            });
        }
        Ok(Self { dim, data })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw row-major storage
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Vector with the given id
    pub fn get(&self, id: usize) -> Option<&[f32]> {
        let start = id.checked_mul(self.dim)?;
        self.data.get(start..start.checked_add(self.dim)?)
    }

    /// Iterate stored vectors in id order
    pub fn iter(&self) -> std::slice::ChunksExact<'_, f32> {
        self.data.chunks_exact(self.dim)
    }

    /// Append `vectors` in order and return the ids they were assigned.
    ///
    /// Every vector is checked before any is stored: on `DimensionMismatch`
    /// the index is unchanged.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<Range<usize>> {
        for (position, v) in vectors.iter().enumerate() {
            self.check_dim(v.as_ref(), position)?;
        }

        let first = self.len();
        self.data.reserve(vectors.len() * self.dim);
        for v in vectors {
            self.data.extend_from_slice(v.as_ref());
        }
        Ok(first..self.len())
    }

    /// Drop every vector with id `>= len`
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len.saturating_mul(self.dim));
    }

    /// Exact top-`k` search by inner product.
    ///
    /// Returns `min(k, len)` hits. `k == 0` yields no hits; `k > 0` on an
    /// empty index is `EmptyIndex`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchHits> {
        self.check_dim(query, 0)?;
        if k == 0 {
            return Ok(SearchHits::default());
        }
        if self.is_empty() {
            return Err(IndexError::EmptyIndex);
        }

        let k = k.min(self.len());
        // Min-heap on rank: the root is the weakest hit kept so far
        let mut heap: BinaryHeap<Reverse<Hit>> = BinaryHeap::with_capacity(k);
        for (id, row) in self.iter().enumerate() {
            let hit = Hit {
                id,
                score: dot_product(query, row),
            };
            if heap.len() < k {
                heap.push(Reverse(hit));
            } else if let Some(mut weakest) = heap.peek_mut() {
                if hit > weakest.0 {
                    *weakest = Reverse(hit);
                }
            }
        }

        let mut hits: Vec<Hit> = heap.into_iter().map(|Reverse(hit)| hit).collect();
        hits.sort_unstable_by(|a, b| b.cmp(a));

        Ok(SearchHits {
            scores: hits.iter().map(|h| h.score).collect(),
            ids: hits.iter().map(|h| h.id).collect(),
        })
    }

    fn check_dim(&self, v: &[f32], position: usize) -> Result<()> {
        if v.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: v.len(),
                position,
            });
        }
        Ok(())
    }
}
