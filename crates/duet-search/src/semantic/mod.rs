//! Text embedding and cosine vector candidates.
//!
//! Every backend implements [`Embedder`]. [`build_embedder`] turns an
//! [`EmbeddingConfig`] into a ready-to-share `Arc<dyn Embedder>`, wrapped in
//! the memoizing [`CachedEmbedder`].

mod cache;
mod hash;
mod model;
pub mod search;

pub use cache::{CacheStats, CachedEmbedder};
pub use hash::HashEmbedder;
pub use model::{ModelFiles, OnnxEmbedder, is_onnx_available};
pub use search::{VectorCandidate, cosine_distance, vector_candidates};

use crate::error::EmbedError;
use anyhow::Result;
use duet_core::config::{EmbedderBackend, EmbeddingConfig};
use std::sync::Arc;
use tracing::info;

/// Maps text to a fixed-length dense vector.
///
/// Implementations must be deterministic (identical input gives bit-identical
/// output) and `embed_batch(&[t])` must equal `[embed(t)]`. Failures are
/// errors, never a placeholder vector.
pub trait Embedder: Send + Sync {
    /// Embed one text.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or produces the wrong length.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, one output per input, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if any text fails to embed.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Build the configured backend behind the embedding cache.
///
/// # Errors
///
/// Returns an error if the dimension cannot be resolved or the backend fails
/// to load.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let dimension = config.resolve_dimension()?;

    let backend: Arc<dyn Embedder> = match config.backend {
        EmbedderBackend::Hash => Arc::new(HashEmbedder::new(config.model.clone(), dimension)?),
        EmbedderBackend::Onnx => {
            let dir = config.resolve_model_dir()?;
            Arc::new(OnnxEmbedder::load(&dir, &config.model, dimension)?)
        }
    };

    info!(
        backend = %config.backend,
        model = %config.model,
        dimension,
        cache_capacity = config.cache_capacity,
        "embedder ready"
    );
    Ok(Arc::new(CachedEmbedder::new(backend, config.cache_capacity)))
}

/// Check a batch result against its input and the embedder's dimension.
pub(crate) fn check_batch(
    expected_len: usize,
    dimension: usize,
    vectors: &[Vec<f32>],
) -> Result<(), EmbedError> {
    if vectors.len() != expected_len {
        return Err(EmbedError::BatchLengthMismatch {
            expected: expected_len,
            actual: vectors.len(),
        });
    }
    for vector in vectors {
        check_vector(dimension, vector)?;
    }
    Ok(())
}

pub(crate) const fn check_vector(dimension: usize, vector: &[f32]) -> Result<(), EmbedError> {
    if vector.len() == dimension {
        Ok(())
    } else {
        Err(EmbedError::OutputDimension {
            expected: dimension,
            actual: vector.len(),
        })
    }
}
