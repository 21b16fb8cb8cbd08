//! Word tokenizer shared by the BM25 index and the built-in embedder.
//!
//! Passages and queries must go through the same function, otherwise lexical
//! matching silently loses recall.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Unicode word runs: letters, digits, underscore
    static ref WORD_RE: Regex = Regex::new(r"\w+").unwrap();
}

/// Lowercase `text` and split it into word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits_on_punctuation() {
        assert_eq!(
            tokenize("Budget, approved! Next-steps?"),
            vec!["budget", "approved", "next", "steps"]
        );
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \n\t ...").is_empty());
    }

    #[test]
    fn test_unicode_words() {
        assert_eq!(tokenize("Réunion 회의 Q3"), vec!["réunion", "회의", "q3"]);
    }

    #[test]
    fn test_speaker_labels() {
        assert_eq!(
            tokenize("SPEAKER_01: we ship Friday"),
            vec!["speaker_01", "we", "ship", "friday"]
        );
    }
}
