//! Nearsight: exact nearest-neighbor retrieval over persisted embedding indexes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CLI (clap)                             │
//! │        create · add · query · stats · remove                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              SimilarityIndex + softmax                      │
//! │         exact inner-product top-k, load-or-create           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    .nsx index file                          │
//! │          checksummed, replaced atomically on save           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod json;

pub use nearsight_core::{embed, error, flat, format, index, shared, simd, softmax};
pub use nearsight_core::{
    dot_product, softmax_with_temperature, Distribution, Embedder, FlatIndex, FormatError,
    IndexError, IndexWriter, OpenMode, OpenOptions, RecoveryPolicy, Result, Retriever,
    SearchHits, SharedIndex, SimilarityIndex,
};
