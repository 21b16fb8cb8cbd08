//! Score fusion and result assembly.
//!
//! The combined score is the plain sum of the dense and sparse scores. The
//! two signals live on different scales (bounded similarity against
//! unbounded BM25), so on large meetings the lexical side tends to dominate.

use std::collections::HashMap;

use serde::Serialize;

use super::dense::rank_order;
use crate::core::meeting::MeetingId;

/// A ranked passage returned to the chat layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub meeting_id: MeetingId,
    /// Passage text.
    pub context: String,
    /// Combined relevance, higher is better, no fixed upper bound.
    pub score: f32,
}

/// Sum dense and sparse scores for every passage in `0..passage_count` and
/// return the top `k` as `(passage_index, combined_score)`.
///
/// A passage missing from either map scores 0 for that signal. Keys outside
/// `0..passage_count` are ignored. Ties go to the lower index.
pub fn fuse(
    dense: &HashMap<usize, f32>,
    sparse: &HashMap<usize, f32>,
    passage_count: usize,
    k: usize,
) -> Vec<(usize, f32)> {
    let mut combined: Vec<(usize, f32)> = (0..passage_count)
        .map(|i| {
            let d = dense.get(&i).copied().unwrap_or(0.0);
            let s = sparse.get(&i).copied().unwrap_or(0.0);
            (i, d + s)
        })
        .collect();

    combined.sort_by(|a, b| rank_order(a.1, a.0, b.1, b.0));
    combined.truncate(k);
    combined
}

/// Map ranked indexes back to passage text, keeping rank order.
pub fn resolve(
    ranked: &[(usize, f32)],
    passages: &[String],
    meeting_id: MeetingId,
) -> Vec<RetrievalResult> {
    ranked
        .iter()
        .filter_map(|&(idx, score)| {
            passages.get(idx).map(|text| RetrievalResult {
                meeting_id,
                context: text.clone(),
                score,
            })
        })
        .collect()
}

/// Concatenate result passages in rank order, for the response generator.
pub fn join_context(results: &[RetrievalResult], separator: &str) -> String {
    results
        .iter()
        .map(|r| r.context.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}
