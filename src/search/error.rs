//! Error types for the retrieval core.

use thiserror::Error;

use crate::core::meeting::MeetingId;

/// Errors raised by the passage store, the indexes and the retrieval engine.
///
/// Missing meetings and malformed passage records are not errors: retrieval
/// recovers from them by returning no results.
#[derive(Debug, Error)]
pub enum Error {
    /// Stored passages and embedding rows disagree. Upstream ingestion wrote
    /// inconsistent data and ranking over it would be meaningless.
    #[error("meeting {meeting_id}: {passages} passages but {rows} embedding rows")]
    Alignment {
        meeting_id: MeetingId,
        passages: usize,
        rows: usize,
    },

    /// The embedding function failed or returned unusable output.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// A query vector does not match the dimensionality of the index.
    #[error("dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Stored embedding blob cannot be decoded.
    #[error("corrupt embedding blob: {0}")]
    CorruptBlob(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for retrieval operations.
pub type Result<T> = std::result::Result<T, Error>;
