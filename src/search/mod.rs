//! Per-meeting hybrid retrieval
//!
//! Dense inner-product search over passage embeddings plus BM25 over the
//! passage text, fused by plain addition.

pub mod dense;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod htp;
pub mod sparse;
pub mod store;

pub use dense::{DenseHit, DenseIndex};
pub use embedding::{Embedder, EmbeddingMatrix, EmbeddingWriter};
pub use engine::{MeetingCorpus, SearchEngine};
pub use error::{Error, Result};
pub use fusion::{fuse, join_context, resolve, RetrievalResult};
pub use htp::HtpEmbedder;
pub use sparse::Bm25Index;
pub use store::{PassageStore, Passages, PutOutcome, StoreStats};
