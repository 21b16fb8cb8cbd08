//! BM25 (Okapi) lexical index over one meeting's passages.
//!
//! IDF is `ln(N - n + 0.5) - ln(n + 0.5)`. Terms present in more than half
//! of the passages get a negative IDF, which is replaced by
//! `epsilon * mean_idf`. Scores are finite for every passage.

use std::collections::{BTreeMap, HashMap};

use crate::config::Bm25Params;
use crate::core::tokenizer::tokenize;

pub struct Bm25Index {
    params: Bm25Params,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn build<S: AsRef<str>>(passages: &[S], params: Bm25Params) -> Self {
        let mut term_freqs = Vec::with_capacity(passages.len());
        let mut doc_lens = Vec::with_capacity(passages.len());
        let mut doc_counts: BTreeMap<String, usize> = BTreeMap::new();

        for passage in passages {
            let tokens = tokenize(passage.as_ref());
            doc_lens.push(tokens.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_insert(0) += 1;
            }
            for term in freqs.keys() {
                *doc_counts.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
        }

        let total_len: usize = doc_lens.iter().sum();
        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            total_len as f64 / doc_lens.len() as f64
        };

        let idf = compute_idf(&doc_counts, passages.len(), params.epsilon as f64);

        Self {
            params,
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    /// One score per passage, aligned with the build order. A query without
    /// tokens scores every passage 0.
    pub fn score(&self, query: &str) -> Vec<f32> {
        let mut scores = vec![0.0f64; self.len()];
        let k1 = self.params.k1 as f64;
        let b = self.params.b as f64;

        for term in tokenize(query) {
            let Some(&idf) = self.idf.get(&term) else {
                continue;
            };
            for (i, freqs) in self.term_freqs.iter().enumerate() {
                let tf = match freqs.get(&term) {
                    Some(&tf) => tf as f64,
                    None => continue,
                };
                // tf > 0 implies avg_doc_len > 0
                let len_ratio = self.doc_lens[i] as f64 / self.avg_doc_len;
                scores[i] += idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * len_ratio));
            }
        }

        scores.into_iter().map(|s| s as f32).collect()
    }
}

/// `doc_counts` is ordered so the mean, and with it the floor, is summed
/// in the same order on every build.
fn compute_idf(doc_counts: &BTreeMap<String, usize>, docs: usize, epsilon: f64) -> HashMap<String, f64> {
    let n = docs as f64;
    let raw: Vec<(&String, f64)> = doc_counts
        .iter()
        .map(|(term, &count)| {
            let count = count as f64;
            (term, (n - count + 0.5).ln() - (count + 0.5).ln())
        })
        .collect();

    if raw.is_empty() {
        return HashMap::new();
    }

    let mean = raw.iter().map(|(_, v)| v).sum::<f64>() / raw.len() as f64;
    let floor = epsilon * mean;
    raw.into_iter()
        .map(|(term, value)| (term.clone(), if value < 0.0 { floor } else { value }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(passages: &[&str]) -> Bm25Index {
        Bm25Index::build(passages, Bm25Params::default())
    }

    #[test]
    fn test_matching_passage_scores_highest() {
        let idx = index(&[
            "the budget was approved for next quarter",
            "marketing will run the launch campaign",
            "hiring plan discussed for engineering",
        ]);
        let scores = idx.score("Budget approval");
        assert_eq!(scores.len(), 3);
        assert!(scores[0] > scores[1]);
        assert!(scores[0] > scores[2]);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        let idx = index(&["alpha beta", "gamma"]);
        assert_eq!(idx.score(""), vec![0.0, 0.0]);
        assert_eq!(idx.score("  ?! "), vec![0.0, 0.0]);
    }

    #[test]
    fn test_query_tokenized_like_passages() {
        let idx = index(&["Roadmap: Q3 DEADLINES", "lunch options", "parking permits"]);
        let scores = idx.score("roadmap q3 deadlines");
        assert!(scores[0] > 0.0);
        assert_eq!(scores[1], 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_known_value() {
        // 3 docs, "budget" in one: idf = ln(2.5) - ln(1.5)
        let idx = index(&["budget review", "team sync", "design review"]);
        let idf = 2.5f64.ln() - 1.5f64.ln();
        // tf 1, doc_len 2, avgdl 2
        let expected = idf * (1.0 * 2.5) / (1.0 + 1.5);
        let scores = idx.score("budget");
        assert!((scores[0] as f64 - expected).abs() < 1e-6);
    }

    #[test]
    fn test_common_term_idf_floored_and_finite() {
        // "review" appears in 2 of 3 docs, raw idf is negative
        let idx = index(&["budget review", "team sync", "design review"]);
        for s in idx.score("review") {
            assert!(s.is_finite());
        }
        assert_eq!(idx.score("review")[1], 0.0);
    }

    #[test]
    fn test_empty_corpus_and_empty_passages() {
        let empty: [&str; 0] = [];
        assert!(index(&empty).score("anything").is_empty());

        let blanks = index(&["", "  "]);
        assert_eq!(blanks.score("anything"), vec![0.0, 0.0]);
    }

    #[test]
    fn test_repeated_terms_accumulate() {
        let idx = index(&["launch launch plan", "status update", "budget notes"]);
        let once = idx.score("launch")[0];
        let twice = idx.score("launch launch")[0];
        assert!((twice - 2.0 * once).abs() < 1e-5);
    }

    #[test]
    fn test_idf_floor_identical_across_builds() {
        let passages: Vec<String> = (0..40)
            .map(|i| format!("common shared words plus term{} and extra{}", i, i % 7))
            .collect();
        let first = Bm25Index::build(&passages, Bm25Params::default());
        let floor = first.idf["common"];
        assert!(floor > 0.0);
        for _ in 0..200 {
            let idx = Bm25Index::build(&passages, Bm25Params::default());
            assert_eq!(idx.idf["common"].to_bits(), floor.to_bits());
            assert_eq!(idx.score("common term3"), first.score("common term3"));
        }
    }
}
