//! Embed new documents and append them to the store in one transaction.

use crate::semantic::{Embedder, check_batch};
use anyhow::{Context, Result};
use duet_core::db::DocumentStore;
use duet_core::model::{DocumentInsert, NewDocument};
use tracing::{info, instrument};

/// Pairs an embedder with a store for bulk loading.
pub struct BulkLoader<'a> {
    embedder: &'a dyn Embedder,
    store: &'a mut DocumentStore,
}

impl<'a> BulkLoader<'a> {
    #[must_use]
    pub fn new(embedder: &'a dyn Embedder, store: &'a mut DocumentStore) -> Self {
        Self { embedder, store }
    }

    /// Embed `"{title} {text}"` for every document in one batch, then insert
    /// them all. Returns the number of rows written.
    ///
    /// Nothing is written if embedding fails, returns the wrong number of
    /// vectors, or any vector has the wrong dimension. Duplicate titles are
    /// inserted as separate rows.
    ///
    /// # Errors
    ///
    /// Returns an error from the embedder or the store.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn load(&mut self, documents: &[NewDocument]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }
        self.store.ensure_dimension(self.embedder.dimension())?;

        let inputs: Vec<String> = documents.iter().map(NewDocument::embedding_input).collect();
        let input_refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
        let vectors = self
            .embedder
            .embed_batch(&input_refs)
            .context("failed to embed documents for insert")?;
        check_batch(documents.len(), self.embedder.dimension(), &vectors)?;

        let rows: Vec<DocumentInsert> = documents
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(doc, embedding)| doc.with_embedding(embedding))
            .collect();

        let inserted = self.store.bulk_insert(&rows)?;
        info!(inserted, model = self.embedder.model_name(), "documents loaded");
        Ok(inserted)
    }
}
