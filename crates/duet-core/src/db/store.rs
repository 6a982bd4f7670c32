//! The document store: one SQLite file holding documents and their vectors.
//!
//! The vector dimension is recorded once in `store_meta` when the schema is
//! created and never changes afterwards. Every write path checks vectors
//! against it before touching the table.

use crate::db::embedding::encode_embedding_json;
use crate::db::{migrations, open_connection, open_in_memory_connection, query};
use crate::error::StoreError;
use crate::model::{Document, DocumentInsert};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Handle to an open document store.
#[derive(Debug)]
pub struct DocumentStore {
    conn: Connection,
    dimension: usize,
}

impl DocumentStore {
    /// Open (or create) the store at `path` with the given vector dimension.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidDimension`] for a zero dimension and
    /// [`StoreError::DimensionMismatch`] when the file was created with a
    /// different one.
    pub fn open(path: &Path, dimension: usize) -> Result<Self> {
        let conn = open_connection(path)?;
        Self::from_connection(conn, dimension)
    }

    /// Throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentStore::open`].
    pub fn open_in_memory(dimension: usize) -> Result<Self> {
        let conn = open_in_memory_connection()?;
        Self::from_connection(conn, dimension)
    }

    /// Wrap an existing connection, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Same as [`DocumentStore::open`].
    pub fn from_connection(mut conn: Connection, dimension: usize) -> Result<Self> {
        create_schema(&mut conn, dimension)?;
        Ok(Self { conn, dimension })
    }

    /// Open a store that must already exist, adopting its recorded dimension.
    ///
    /// Returns `Ok(None)` if there is no file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SchemaMissing`] if the file exists but was never
    /// initialized, or an error if it cannot be opened.
    pub fn open_existing(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let mut conn = open_connection(path)?;
        migrations::migrate(&mut conn).context("apply document store migrations")?;
        let dimension = stored_dimension(&conn)?.ok_or(StoreError::SchemaMissing)?;
        debug!(path = %path.display(), dimension, "opened existing document store");
        Ok(Some(Self { conn, dimension }))
    }

    /// The dimension every stored vector has.
    #[must_use]
    pub const fn vector_dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Check that a vector of length `actual` fits this store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DimensionMismatch`] on any difference.
    pub fn ensure_dimension(&self, actual: usize) -> Result<()> {
        if actual == self.dimension {
            Ok(())
        } else {
            Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual,
            }
            .into())
        }
    }

    /// Insert all rows in one transaction; nothing is written if any row is
    /// rejected. Every row gets the same `created_at` timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DimensionMismatch`] if any embedding has the
    /// wrong length, or an error if encoding or the write fails.
    #[instrument(skip_all, fields(rows = docs.len()))]
    pub fn bulk_insert(&mut self, docs: &[DocumentInsert]) -> Result<usize> {
        if docs.is_empty() {
            return Ok(0);
        }

        let mut encoded = Vec::with_capacity(docs.len());
        for (idx, doc) in docs.iter().enumerate() {
            self.ensure_dimension(doc.embedding.len())
                .with_context(|| format!("document {idx} ('{}')", doc.title))?;
            encoded.push(
                encode_embedding_json(&doc.embedding)
                    .with_context(|| format!("document {idx} ('{}')", doc.title))?,
            );
        }

        let created_at_us = Utc::now().timestamp_micros();
        let tx = self
            .conn
            .transaction()
            .context("begin bulk insert transaction")?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO documents (category, title, text, embedding_json, created_at_us)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .context("prepare document insert")?;
            for (doc, embedding_json) in docs.iter().zip(&encoded) {
                stmt.execute(params![
                    doc.category,
                    doc.title,
                    doc.text,
                    embedding_json,
                    created_at_us
                ])
                .with_context(|| format!("insert document '{}'", doc.title))?;
            }
        }
        tx.commit().context("commit bulk insert")?;

        info!(rows = docs.len(), "bulk insert committed");
        Ok(docs.len())
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<u64> {
        query::count_documents(&self.conn)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_by_category(&self) -> Result<BTreeMap<String, u64>> {
        query::category_counts(&self.conn)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails or the stored vector is corrupt.
    pub fn get(&self, id: i64) -> Result<Option<Document>> {
        query::get_document(&self.conn, id)
    }
}

/// Create tables and indexes, then pin the vector dimension.
///
/// Idempotent for the same dimension.
///
/// # Errors
///
/// Returns [`StoreError::InvalidDimension`] for zero, or
/// [`StoreError::DimensionMismatch`] if a different dimension is already
/// recorded.
pub fn create_schema(conn: &mut Connection, dimension: usize) -> Result<()> {
    if dimension == 0 {
        return Err(StoreError::InvalidDimension.into());
    }
    let dimension_i64 = i64::try_from(dimension).context("vector dimension out of range")?;

    migrations::migrate(conn).context("apply document store migrations")?;

    let pinned = conn
        .execute(
            "UPDATE store_meta
             SET vector_dimension = ?1, created_at_us = ?2
             WHERE id = 1 AND vector_dimension IS NULL",
            params![dimension_i64, Utc::now().timestamp_micros()],
        )
        .context("record vector dimension")?;
    if pinned > 0 {
        info!(dimension, "document store created");
    }

    let stored = stored_dimension(conn)?.ok_or(StoreError::SchemaMissing)?;
    if stored != dimension {
        return Err(StoreError::DimensionMismatch {
            expected: stored,
            actual: dimension,
        }
        .into());
    }
    Ok(())
}

/// Dimension recorded in `store_meta`, or `None` before the first
/// [`create_schema`].
///
/// # Errors
///
/// Returns an error if `store_meta` is unreadable.
pub fn stored_dimension(conn: &Connection) -> Result<Option<usize>> {
    let value: Option<Option<i64>> = conn
        .query_row(
            "SELECT vector_dimension FROM store_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .context("read store_meta")?;

    value
        .flatten()
        .map(|dim| usize::try_from(dim).context("stored vector dimension out of range"))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewDocument;

    fn doc(title: &str, embedding: Vec<f32>) -> DocumentInsert {
        NewDocument::new("c", title, "body").with_embedding(embedding)
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let err = DocumentStore::open_in_memory(0).expect_err("zero dimension");
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::InvalidDimension)
        );
    }

    #[test]
    fn create_schema_is_idempotent_for_same_dimension() {
        let mut conn = open_in_memory_connection().expect("conn");
        create_schema(&mut conn, 2).expect("first");
        create_schema(&mut conn, 2).expect("second");
        assert_eq!(stored_dimension(&conn).expect("dim"), Some(2));
    }

    #[test]
    fn create_schema_rejects_different_dimension() {
        let mut conn = open_in_memory_connection().expect("conn");
        create_schema(&mut conn, 2).expect("first");
        let err = create_schema(&mut conn, 384).expect_err("mismatch");
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::DimensionMismatch {
                expected: 2,
                actual: 384
            })
        );
    }

    #[test]
    fn bulk_insert_assigns_increasing_ids_and_shared_timestamp() {
        let mut store = DocumentStore::open_in_memory(2).expect("store");
        let inserted = store
            .bulk_insert(&[doc("a", vec![1.0, 0.0]), doc("b", vec![0.0, 1.0])])
            .expect("insert");
        assert_eq!(inserted, 2);

        let first = store.get(1).expect("get").expect("row 1");
        let second = store.get(2).expect("get").expect("row 2");
        assert_eq!(first.title, "a");
        assert_eq!(second.title, "b");
        assert_eq!(first.created_at, second.created_at);
    }

    #[test]
    fn bulk_insert_is_all_or_nothing() {
        let mut store = DocumentStore::open_in_memory(2).expect("store");
        let err = store
            .bulk_insert(&[doc("ok", vec![1.0, 0.0]), doc("bad", vec![1.0, 0.0, 0.0])])
            .expect_err("mismatch");
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn bulk_insert_of_nothing_is_a_no_op() {
        let mut store = DocumentStore::open_in_memory(2).expect("store");
        assert_eq!(store.bulk_insert(&[]).expect("insert"), 0);
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn non_finite_embedding_is_rejected() {
        let mut store = DocumentStore::open_in_memory(2).expect("store");
        assert!(store.bulk_insert(&[doc("nan", vec![f32::NAN, 0.0])]).is_err());
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn reopen_adopts_recorded_dimension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("duet.db");
        {
            let mut store = DocumentStore::open(&path, 3).expect("create");
            store
                .bulk_insert(&[doc("a", vec![1.0, 0.0, 0.0])])
                .expect("insert");
        }

        let store = DocumentStore::open_existing(&path)
            .expect("open")
            .expect("exists");
        assert_eq!(store.vector_dimension(), 3);
        assert_eq!(store.count().expect("count"), 1);

        let err = DocumentStore::open(&path, 2).expect_err("dimension is fixed");
        assert!(err.downcast_ref::<StoreError>().is_some());
    }

    #[test]
    fn open_existing_returns_none_for_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.db");
        assert!(DocumentStore::open_existing(&missing).expect("ok").is_none());
        assert!(!missing.exists());
    }

    #[test]
    fn ensure_dimension_reports_both_sides() {
        let store = DocumentStore::open_in_memory(4).expect("store");
        assert!(store.ensure_dimension(4).is_ok());
        let err = store.ensure_dimension(5).expect_err("mismatch");
        assert!(err.to_string().contains("expects 4, got 5"));
    }
}
