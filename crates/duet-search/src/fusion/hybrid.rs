//! Hybrid search orchestration across the vector and lexical layers.
//!
//! Both layers always run against the same category scope:
//! - vector: cosine candidates under the distance threshold, capped
//! - lexical: every document in scope, scored by substring and trigrams
//!
//! An unknown category simply produces two empty layers.

use crate::fusion::scoring::{ScoredDocument, fuse};
use crate::lexical::lexical_candidates;
use crate::semantic::{Embedder, vector_candidates};
use anyhow::{Context, Result};
use duet_core::db::DocumentStore;
use tracing::{debug, instrument};

/// Rank documents by `0.7 * vector_score + 0.3 * text_score`.
///
/// `category` of `None` searches everything; `Some(c)` matches `c` exactly.
/// Returns at most `limit` documents; `limit == 0` returns none.
///
/// # Errors
///
/// Returns [`duet_core::error::StoreError::DimensionMismatch`] if
/// `query_vector` does not fit the store, or an error if reading fails.
#[instrument(skip(store, query_vector), fields(dimension = query_vector.len()))]
pub fn hybrid_search(
    store: &DocumentStore,
    query_vector: &[f32],
    query_text: &str,
    category: Option<&str>,
    limit: usize,
) -> Result<Vec<ScoredDocument>> {
    store.ensure_dimension(query_vector.len())?;
    if limit == 0 {
        return Ok(Vec::new());
    }

    let vector = vector_candidates(store, query_vector, category)
        .context("vector candidate search failed")?;
    let lexical = lexical_candidates(store.connection(), query_text, category)
        .context("lexical candidate search failed")?;
    debug!(
        vector = vector.len(),
        lexical = lexical.len(),
        "fusing candidate sets"
    );

    Ok(fuse(vector, lexical, limit))
}

/// Embed `query_text` and run [`hybrid_search`] with the same text.
///
/// # Errors
///
/// Returns an error if embedding fails or the search fails.
pub fn search_text(
    store: &DocumentStore,
    embedder: &dyn Embedder,
    query_text: &str,
    category: Option<&str>,
    limit: usize,
) -> Result<Vec<ScoredDocument>> {
    let query_vector = embedder
        .embed(query_text)
        .context("failed to embed search query")?;
    hybrid_search(store, &query_vector, query_text, category, limit)
}
