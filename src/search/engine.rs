//! Search Engine - per-meeting hybrid retrieval
//!
//! Every call loads one meeting's passages and embeddings, builds a fresh
//! dense index and BM25 index over them, scores the query against both and
//! fuses the results. Nothing is cached between calls, so a query can only
//! ever see the meeting it names.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::dense::DenseIndex;
use super::embedding::{Embedder, EmbeddingMatrix, EmbeddingWriter};
use super::error::{Error, Result};
use super::fusion::{fuse, join_context, resolve, RetrievalResult};
use super::htp::HtpEmbedder;
use super::sparse::Bm25Index;
use super::store::{PassageStore, Passages, PutOutcome};
use crate::config::{Bm25Params, RetrievalConfig};
use crate::core::meeting::MeetingId;
use crate::core::paths::DataPaths;

/// One meeting's passages with their embedding rows, checked for alignment.
#[derive(Debug, Clone)]
pub struct MeetingCorpus {
    meeting_id: MeetingId,
    passages: Vec<String>,
    matrix: EmbeddingMatrix,
}

impl MeetingCorpus {
    /// Fails with [`Error::Alignment`] unless there is exactly one embedding
    /// row per passage.
    pub fn new(meeting_id: MeetingId, passages: Vec<String>, matrix: EmbeddingMatrix) -> Result<Self> {
        if passages.len() != matrix.rows() {
            return Err(Error::Alignment {
                meeting_id,
                passages: passages.len(),
                rows: matrix.rows(),
            });
        }
        Ok(Self {
            meeting_id,
            passages,
            matrix,
        })
    }

    pub fn meeting_id(&self) -> MeetingId {
        self.meeting_id
    }

    pub fn passages(&self) -> &[String] {
        &self.passages
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Score `query` against both indexes and return the fused top `k`.
    pub fn rank(
        self,
        query: &str,
        query_vector: &[f32],
        k: usize,
        bm25: Bm25Params,
    ) -> Result<Vec<RetrievalResult>> {
        let Self {
            meeting_id,
            passages,
            matrix,
        } = self;

        let dense = DenseIndex::build(matrix);
        let dense_scores: HashMap<usize, f32> = dense
            .search(query_vector, k)?
            .into_iter()
            .map(|hit| (hit.row, hit.score))
            .collect();

        let sparse = Bm25Index::build(&passages, bm25);
        let sparse_scores: HashMap<usize, f32> = sparse.score(query).into_iter().enumerate().collect();

        let ranked = fuse(&dense_scores, &sparse_scores, passages.len(), k);
        Ok(resolve(&ranked, &passages, meeting_id))
    }
}

/// Search engine combining the passage store, the embedder and the indexes
pub struct SearchEngine {
    store: PassageStore,
    writer: EmbeddingWriter,
    config: RetrievalConfig,
}

impl SearchEngine {
    pub fn new(db_path: &Path, embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Result<Self> {
        Ok(Self::with_store(PassageStore::open(db_path)?, embedder, config))
    }

    /// Create with in-memory database (for testing)
    pub fn new_in_memory(embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Result<Self> {
        Ok(Self::with_store(PassageStore::open_in_memory()?, embedder, config))
    }

    pub fn with_store(store: PassageStore, embedder: Arc<dyn Embedder>, config: RetrievalConfig) -> Self {
        let writer = EmbeddingWriter::new(embedder, config.embed_batch_size);
        Self {
            store,
            writer,
            config,
        }
    }

    /// Open the database under `paths` with the built-in HTP embedder and the
    /// configuration file found there, if any.
    pub fn open(paths: &DataPaths) -> Result<Self> {
        let config = RetrievalConfig::load(&paths.config)?;
        let embedder = HtpEmbedder::new(config.embedding_dim)?;
        Self::new(&paths.db, Arc::new(embedder), config)
    }

    pub fn store(&self) -> &PassageStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PassageStore {
        &mut self.store
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Embed and store a meeting's summary chunks.
    pub fn ingest<S: AsRef<str>>(&mut self, meeting_id: MeetingId, chunks: &[S]) -> Result<PutOutcome> {
        self.store.put(&self.writer, meeting_id, chunks)
    }

    /// Embed and store chunks decoded from JSON.
    pub fn ingest_json(&mut self, meeting_id: MeetingId, chunks: &serde_json::Value) -> Result<PutOutcome> {
        self.store.put_json(&self.writer, meeting_id, chunks)
    }

    /// Load a meeting's corpus. `None` when the meeting has no embeddings,
    /// no passages, or a malformed passage record.
    pub fn load_corpus(&self, meeting_id: MeetingId) -> Result<Option<MeetingCorpus>> {
        let Some(matrix) = self.store.get_embeddings(meeting_id)? else {
            debug!(%meeting_id, "no embeddings for meeting");
            return Ok(None);
        };

        let passages = match self.store.get_passages(meeting_id)? {
            Some(Passages::Valid(passages)) if !passages.is_empty() => passages,
            Some(Passages::Valid(_)) => {
                if matrix.is_empty() {
                    debug!(%meeting_id, "meeting has no passages");
                } else {
                    warn!(
                        %meeting_id,
                        rows = matrix.rows(),
                        "no passages stored for existing embedding rows"
                    );
                }
                return Ok(None);
            }
            Some(Passages::Malformed) => {
                warn!(%meeting_id, "malformed passage record, treating as empty");
                return Ok(None);
            }
            None => {
                debug!(%meeting_id, "no passage record for meeting");
                return Ok(None);
            }
        };

        MeetingCorpus::new(meeting_id, passages, matrix).map(Some)
    }

    /// Hybrid retrieval over a single meeting.
    ///
    /// Returns at most `top_k` results, best first. A meeting without
    /// embeddings or passages yields an empty list; misaligned stored data
    /// is an error.
    pub fn retrieve(&self, query: &str, meeting_id: MeetingId, top_k: usize) -> Result<Vec<RetrievalResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let Some(corpus) = self.load_corpus(meeting_id)? else {
            return Ok(Vec::new());
        };

        let passages = corpus.len();
        let query_vector = self.writer.embed_query(query)?;
        let results = corpus.rank(query, &query_vector, top_k, self.config.bm25)?;

        debug!(%meeting_id, passages, top_k, returned = results.len(), "retrieved passages");
        Ok(results)
    }

    /// Retrieve and join the passages into one context string.
    pub fn retrieve_context(&self, query: &str, meeting_id: MeetingId, top_k: usize) -> Result<String> {
        let results = self.retrieve(query, meeting_id, top_k)?;
        Ok(join_context(&results, &self.config.context_separator))
    }
}
