//! Nearsight Core – exact inner-product retrieval over persisted embeddings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │        Retriever (Embedder seam: text -> vectors)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │   SimilarityIndex / SharedIndex · softmax distributions     │
//! │   load-or-create · corruption recovery · atomic persist     │
//! ├─────────────────────────────────────────────────────────────┤
//! │   FlatIndex (brute-force top-k, SIMD dot product)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │   .nsx file format (header · f32 rows · SHA-256 trailer)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod embed;
pub mod error;
pub mod flat;
pub mod format;
pub mod index;
pub mod shared;
pub mod simd;
pub mod softmax;

pub use embed::{Embedder, Retriever};
pub use error::{IndexError, Result};
pub use flat::{FlatIndex, SearchHits};
pub use format::{FormatError, IndexWriter};
pub use index::{Distribution, OpenMode, OpenOptions, RecoveryPolicy, SimilarityIndex};
pub use shared::SharedIndex;
pub use simd::dot_product;
pub use softmax::{softmax, softmax_with_temperature};
