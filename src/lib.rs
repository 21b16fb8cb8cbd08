//! meeting-recall library
//!
//! Question answering over recorded meetings, grounded in each meeting's own
//! transcript passages.
//!
//! # Modules
//!
//! - `core`: Meeting identifiers and records, data paths, the shared tokenizer
//! - `search`: Passage store, dense and BM25 indexes, fusion, retrieval engine
//! - `config`: Retrieval configuration

pub mod config;
pub mod core;
pub mod search;

// Re-exports for convenience
pub use crate::config::{Bm25Params, RetrievalConfig};
pub use crate::core::meeting::{ChatEntry, MeetingId, MeetingRecord};
pub use crate::core::paths::DataPaths;
pub use crate::search::{Embedder, RetrievalResult, SearchEngine};
