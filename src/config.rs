//! Retrieval configuration.
//!
//! Defaults: five passages per answer and BM25 Okapi with `k1 = 1.5`, `b = 0.75`,
//! `epsilon = 0.25`. A `config.yaml` in the data directory may override any
//! field.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::search::error::{Error, Result};

/// BM25 Okapi parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Bm25Params {
    /// Term frequency saturation.
    pub k1: f32,
    /// Document length normalization, in `[0, 1]`.
    pub b: f32,
    /// Floor for negative IDF values, as a fraction of the mean IDF.
    pub epsilon: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75, epsilon: 0.25 }
    }
}

/// Configuration for ingestion and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages returned when the caller does not ask for a count.
    pub top_k: usize,
    pub bm25: Bm25Params,
    /// Maximum texts handed to the embedder per call.
    pub embed_batch_size: usize,
    /// Separator used when joining retrieved passages into one context.
    pub context_separator: String,
    /// Output width of the built-in embedder.
    pub embedding_dim: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            bm25: Bm25Params::default(),
            embed_batch_size: 32,
            context_separator: "\n".to_string(),
            embedding_dim: 384,
        }
    }
}

impl RetrievalConfig {
    pub fn builder() -> RetrievalConfigBuilder {
        RetrievalConfigBuilder::default()
    }

    /// Load from a YAML file, or return defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_yaml::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::Config("top_k must be greater than zero".to_string()));
        }
        if self.embed_batch_size == 0 {
            return Err(Error::Config(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if !self.bm25.k1.is_finite() || self.bm25.k1 < 0.0 {
            return Err(Error::Config(format!(
                "bm25.k1 ({}) must be finite and >= 0",
                self.bm25.k1
            )));
        }
        if !self.bm25.epsilon.is_finite() || self.bm25.epsilon < 0.0 {
            return Err(Error::Config(format!(
                "bm25.epsilon ({}) must be finite and >= 0",
                self.bm25.epsilon
            )));
        }
        // NaN is outside the range
        if !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(Error::Config(format!("bm25.b ({}) must be in [0, 1]", self.bm25.b)));
        }
        if self.embedding_dim == 0 || self.embedding_dim % 2 != 0 {
            return Err(Error::Config(format!(
                "embedding_dim ({}) must be a positive even number",
                self.embedding_dim
            )));
        }
        Ok(())
    }
}

/// Builder for a validated [`RetrievalConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetrievalConfigBuilder {
    config: RetrievalConfig,
}

impl RetrievalConfigBuilder {
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn bm25(mut self, params: Bm25Params) -> Self {
        self.config.bm25 = params;
        self
    }

    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    pub fn context_separator(mut self, separator: impl Into<String>) -> Self {
        self.config.context_separator = separator.into();
        self
    }

    pub fn embedding_dim(mut self, dim: usize) -> Self {
        self.config.embedding_dim = dim;
        self
    }

    pub fn build(self) -> Result<RetrievalConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
