//! Text-to-index glue
//!
//! The index only sees vectors. Turning text into vectors (tokenizers, model
//! weights, device selection) lives behind [`Embedder`]; [`Retriever`] wires
//! an embedder to a [`SimilarityIndex`].

use std::ops::Range;
use std::path::Path;

use crate::error::{IndexError, Result};
use crate::index::{Distribution, OpenOptions, SimilarityIndex};

/// Batch text embedder producing fixed-length vectors
pub trait Embedder {
    /// Length of every vector returned by [`embed`](Self::embed)
    fn dimension(&self) -> usize;

    /// One vector per input text, in input order
    fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;
}

pub struct Retriever<E> {
    embedder: E,
    index: SimilarityIndex,
}

impl<E: Embedder> Retriever<E> {
    /// Open (or create) the index at `path` sized for `embedder`
    pub fn open<P: AsRef<Path>>(embedder: E, path: P, options: OpenOptions) -> Result<Self> {
        let index = SimilarityIndex::open_with(path, embedder.dimension(), options)?;
        Ok(Self { embedder, index })
    }

    /// Embed `texts` and add them with one persist. Ids follow input order.
    pub fn index_texts(&mut self, texts: &[&str]) -> Result<Range<usize>> {
        let vectors = self.embed(texts)?;
        self.index.add(&vectors)
    }

    /// Top-`k` stored entries for `text` with softmax confidences
    pub fn query(&self, text: &str, k: usize) -> Result<Distribution> {
        let mut vectors = self.embed(&[text])?;
        let query = vectors.pop().unwrap_or_default();
        self.index.probability_distribution(&query, k)
    }

    pub fn index(&self) -> &SimilarityIndex {
        &self.index
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed(texts).map_err(IndexError::Embedding)?;
        if vectors.len() != texts.len() {
            return Err(IndexError::Embedding(anyhow::anyhow!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}
