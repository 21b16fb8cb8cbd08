//! Harmonic Token Projection (HTP) embedder
//!
//! Deterministic, training-free text encoder based on
//! "Harmonic Token Projection: A Vocabulary-Free, Training-Free,
//!  Deterministic, and Reversible Embedding Methodology"
//! https://arxiv.org/html/2511.20665
//!
//! It has no notion of meaning beyond shared tokens, but it lets the tool
//! ingest and answer without a model download. Any semantic encoder can be
//! plugged in through [`Embedder`] instead.

use std::f64::consts::PI;

use super::embedding::Embedder;
use super::error::{Error, Result};
use crate::core::tokenizer::tokenize;

/// Tokens longer than this (in code points) are truncated.
const MAX_TOKEN_LENGTH: usize = 64;

pub struct HtpEmbedder {
    moduli: Vec<u64>,
}

impl HtpEmbedder {
    /// Create an embedder producing `dim`-wide vectors. `dim` must be even.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 || dim % 2 != 0 {
            return Err(Error::Config(format!(
                "HTP dimension must be a positive even number, got {}",
                dim
            )));
        }
        Ok(Self { moduli: first_primes(dim / 2) })
    }

    pub fn dim(&self) -> usize {
        self.moduli.len() * 2
    }

    /// Mean of the token projections, L2 normalized. Zero vector for text
    /// without tokens.
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return vec![0.0; self.dim()];
        }

        let mut sum = vec![0.0f64; self.dim()];

        for token in &tokens {
            let n = token_to_integer(token);
            for (i, &m) in self.moduli.iter().enumerate() {
                let theta = 2.0 * PI * ((n % m) as f64) / (m as f64);
                sum[2 * i] += theta.sin();
                sum[2 * i + 1] += theta.cos();
            }
        }

        let count = tokens.len() as f64;
        for val in &mut sum {
            *val /= count;
        }

        let norm = sum.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            sum.iter().map(|x| (x / norm) as f32).collect()
        } else {
            sum.iter().map(|x| *x as f32).collect()
        }
    }
}

impl Embedder for HtpEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Base-2^16 positional encoding of the token's code points.
fn token_to_integer(token: &str) -> u64 {
    token
        .chars()
        .take(MAX_TOKEN_LENGTH)
        .fold(0u64, |n, c| n.wrapping_mul(65536).wrapping_add(c as u64))
}

/// The first `count` primes, pairwise coprime by construction.
fn first_primes(count: usize) -> Vec<u64> {
    let mut primes: Vec<u64> = Vec::with_capacity(count);
    let mut candidate = 2u64;
    while primes.len() < count {
        if primes
            .iter()
            .take_while(|&&p| p * p <= candidate)
            .all(|&p| candidate % p != 0)
        {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}
