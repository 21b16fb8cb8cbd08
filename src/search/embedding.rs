//! Embedding function seam, embedding matrix and the ingestion-side writer.

use std::sync::Arc;

use tracing::debug;

use super::error::{Error, Result};

/// A text encoder producing fixed-width vectors.
///
/// Implementations are long-lived and stateless from the caller's point of
/// view. `embed_batch` must return one vector per input, in input order.
pub trait Embedder: Send + Sync {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut rows = self.embed_batch(&[text])?;
        match rows.pop() {
            Some(row) if rows.is_empty() => Ok(row),
            _ => Err(Error::Embedding(
                "embedder returned wrong row count for a single text".to_string(),
            )),
        }
    }
}

impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}

/// Size of the blob header: row count and dimension as little-endian `u32`.
const BLOB_HEADER_LEN: usize = 8;

/// Dense row-major `f32` matrix, one row per passage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmbeddingMatrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// Build from individual rows. All rows must share one dimension.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dim = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(Error::Embedding(format!(
                    "row {} has dimension {}, expected {}",
                    i,
                    row.len(),
                    dim
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { rows: rows.len(), dim, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        if i >= self.rows {
            return None;
        }
        let start = i * self.dim;
        Some(&self.data[start..start + self.dim])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        (0..self.rows).filter_map(move |i| self.row(i))
    }

    /// Append all rows of `other`, which must have the same dimension.
    fn extend(&mut self, other: EmbeddingMatrix) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.dim != self.dim {
            return Err(Error::Embedding(format!(
                "batch dimension {} differs from {}",
                other.dim, self.dim
            )));
        }
        self.rows += other.rows;
        self.data.extend(other.data);
        Ok(())
    }

    /// Serialize as `rows: u32 LE, dim: u32 LE` followed by the values.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(BLOB_HEADER_LEN + self.data.len() * 4);
        blob.extend_from_slice(&(self.rows as u32).to_le_bytes());
        blob.extend_from_slice(&(self.dim as u32).to_le_bytes());
        for &val in &self.data {
            blob.extend_from_slice(&val.to_le_bytes());
        }
        blob
    }

    pub fn from_blob(blob: &[u8]) -> Result<Self> {
        if blob.len() < BLOB_HEADER_LEN {
            return Err(Error::CorruptBlob(format!("{} bytes, missing header", blob.len())));
        }
        let (header, body) = blob.split_at(BLOB_HEADER_LEN);
        let rows = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let dim = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let expected = rows
            .checked_mul(dim)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| Error::CorruptBlob(format!("{} x {} overflows", rows, dim)))?;
        if body.len() != expected {
            return Err(Error::CorruptBlob(format!(
                "{} x {} matrix needs {} bytes, found {}",
                rows,
                dim,
                expected,
                body.len()
            )));
        }

        let data = body
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { rows, dim, data })
    }
}

/// Producer side of the passage store: batches texts through an [`Embedder`]
/// and normalizes the output into an [`EmbeddingMatrix`].
#[derive(Clone)]
pub struct EmbeddingWriter {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl EmbeddingWriter {
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed `texts`, row `i` of the result corresponding to `texts[i]`.
    pub fn embed<S: AsRef<str>>(&self, texts: &[S]) -> Result<EmbeddingMatrix> {
        let refs: Vec<&str> = texts.iter().map(AsRef::as_ref).collect();
        let mut matrix = EmbeddingMatrix::default();

        for batch in refs.chunks(self.batch_size) {
            let rows = self.embedder.embed_batch(batch)?;
            if rows.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "embedder returned {} vectors for {} texts",
                    rows.len(),
                    batch.len()
                )));
            }
            matrix.extend(EmbeddingMatrix::from_rows(rows)?)?;
        }

        debug!(rows = matrix.rows(), dim = matrix.dim(), "embedded texts");
        Ok(matrix)
    }

    /// Embed a query string.
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embedder.embed(text)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FailingEmbedder, FakeEmbedder};
    use super::*;

    #[test]
    fn test_blob_conversion() {
        let matrix =
            EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![-0.5, 0.0, 4.25]]).unwrap();
        let recovered = EmbeddingMatrix::from_blob(&matrix.to_blob()).unwrap();
        assert_eq!(matrix, recovered);
        assert_eq!(recovered.rows(), 2);
        assert_eq!(recovered.dim(), 3);
    }

    #[test]
    fn test_truncated_blob_is_corrupt() {
        let matrix = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0]]).unwrap();
        let mut blob = matrix.to_blob();
        blob.pop();
        assert!(matches!(EmbeddingMatrix::from_blob(&blob), Err(Error::CorruptBlob(_))));
        assert!(matches!(EmbeddingMatrix::from_blob(&[1, 2]), Err(Error::CorruptBlob(_))));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = EmbeddingMatrix::from_rows(vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[test]
    fn test_writer_preserves_order_across_batches() {
        let embedder = FakeEmbedder::new(vec![0.0, 0.0])
            .with("a", vec![1.0, 0.0])
            .with("b", vec![0.0, 1.0])
            .with("c", vec![1.0, 1.0]);
        let embedder = Arc::new(embedder);
        let writer = EmbeddingWriter::new(embedder.clone(), 2);

        let matrix = writer.embed(&["a", "b", "c"]).unwrap();
        assert_eq!(matrix.rows(), 3);
        assert_eq!(matrix.row(0).unwrap(), &[1.0, 0.0]);
        assert_eq!(matrix.row(1).unwrap(), &[0.0, 1.0]);
        assert_eq!(matrix.row(2).unwrap(), &[1.0, 1.0]);
        // 3 texts, batch size 2
        assert_eq!(embedder.calls(), 2);
    }

    #[test]
    fn test_writer_single_call_when_batch_fits() {
        let embedder = Arc::new(FakeEmbedder::new(vec![0.5]));
        let writer = EmbeddingWriter::new(embedder.clone(), 32);
        writer.embed(&["one", "two", "three"]).unwrap();
        assert_eq!(embedder.calls(), 1);
    }

    #[test]
    fn test_writer_propagates_failure() {
        let writer = EmbeddingWriter::new(Arc::new(FailingEmbedder), 8);
        assert!(matches!(writer.embed(&["x"]), Err(Error::Embedding(_))));
    }

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0]).collect())
        }
    }

    #[test]
    fn test_writer_rejects_missing_rows() {
        let writer = EmbeddingWriter::new(Arc::new(ShortEmbedder), 8);
        assert!(matches!(writer.embed(&["x", "y"]), Err(Error::Embedding(_))));
    }
}
