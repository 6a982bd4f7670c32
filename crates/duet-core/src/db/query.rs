//! Read-side query helpers for the document store.
//!
//! All functions take a shared `&Connection` and return typed rows. A
//! `category` of `None` means "every category"; `Some("")` filters to
//! documents whose category is the empty string.

use crate::db::embedding::decode_embedding_json;
use crate::model::{Document, DocumentRow};
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, named_params, params};
use std::collections::BTreeMap;
use tracing::warn;

/// A document row paired with its decoded embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub row: DocumentRow,
    pub embedding: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Search inputs
// ---------------------------------------------------------------------------

/// Every document in scope for the lexical pass, ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn lexical_rows(conn: &Connection, category: Option<&str>) -> Result<Vec<DocumentRow>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, category, title, text, created_at_us
             FROM documents
             WHERE (:category IS NULL OR category = :category)
             ORDER BY id",
        )
        .context("prepare lexical row query")?;

    let rows = stmt
        .query_map(named_params! { ":category": category }, row_to_document_row)
        .context("execute lexical row query")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read lexical rows")?;
    Ok(rows)
}

/// Every document in scope together with its embedding, ordered by id.
///
/// Rows whose stored JSON cannot be decoded are logged and skipped.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn embedding_rows(conn: &Connection, category: Option<&str>) -> Result<Vec<StoredEmbedding>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT id, category, title, text, created_at_us, embedding_json
             FROM documents
             WHERE (:category IS NULL OR category = :category)
             ORDER BY id",
        )
        .context("prepare embedding scan query")?;

    let raw = stmt
        .query_map(named_params! { ":category": category }, |row| {
            Ok((row_to_document_row(row)?, row.get::<_, String>(5)?))
        })
        .context("execute embedding scan query")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read embedding rows")?;

    let mut out = Vec::with_capacity(raw.len());
    for (row, encoded) in raw {
        match decode_embedding_json(&encoded) {
            Ok(embedding) => out.push(StoredEmbedding { row, embedding }),
            Err(err) => warn!(id = row.id, error = %err, "skipping undecodable embedding"),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Point lookups and aggregates
// ---------------------------------------------------------------------------

/// Fetch one document, embedding included.
///
/// # Errors
///
/// Returns an error if the query fails or the stored embedding is corrupt.
pub fn get_document(conn: &Connection, id: i64) -> Result<Option<Document>> {
    let found = conn
        .query_row(
            "SELECT id, category, title, text, created_at_us, embedding_json
             FROM documents WHERE id = ?1",
            params![id],
            |row| Ok((row_to_document_row(row)?, row.get::<_, String>(5)?)),
        )
        .optional()
        .with_context(|| format!("get_document for id {id}"))?;

    let Some((row, encoded)) = found else {
        return Ok(None);
    };
    let embedding = decode_embedding_json(&encoded)
        .with_context(|| format!("decode embedding of document {id}"))?;

    Ok(Some(Document {
        created_at: row.created_at(),
        id: row.id,
        category: row.category,
        title: row.title,
        text: row.text,
        embedding,
    }))
}

/// Total number of stored documents.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn count_documents(conn: &Connection) -> Result<u64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
        .context("count documents")?;
    Ok(u64::try_from(count).unwrap_or(0))
}

/// Document counts keyed by category, in category order.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn category_counts(conn: &Connection) -> Result<BTreeMap<String, u64>> {
    let mut stmt = conn
        .prepare(
            "SELECT category, COUNT(*)
             FROM documents
             GROUP BY category",
        )
        .context("prepare category count query")?;

    let mut counts = BTreeMap::new();
    let rows = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .context("execute category count query")?;
    for row in rows {
        let (category, count) = row.context("read category count row")?;
        counts.insert(category, u64::try_from(count).unwrap_or(0));
    }
    Ok(counts)
}

pub(crate) fn row_to_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        category: row.get(1)?,
        title: row.get(2)?,
        text: row.get(3)?,
        created_at_us: row.get(4)?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DocumentStore;
    use crate::model::NewDocument;

    fn seeded() -> DocumentStore {
        let mut store = DocumentStore::open_in_memory(2).expect("store");
        let docs = vec![
            NewDocument::new("前半", "星座：牡羊座", "3/21-4/19.").with_embedding(vec![1.0, 0.0]),
            NewDocument::new("後半", "星座：天秤座", "9/23-10/23.").with_embedding(vec![-1.0, 0.0]),
            NewDocument::new("", "untitled", "no category").with_embedding(vec![0.0, 1.0]),
            NewDocument::new("前半", "星座：牡牛座", "4/20-5/20.").with_embedding(vec![0.8, 0.6]),
        ];
        store.bulk_insert(&docs).expect("insert");
        store
    }

    #[test]
    fn lexical_rows_without_filter_returns_everything_in_id_order() {
        let store = seeded();
        let rows = lexical_rows(store.connection(), None).expect("rows");
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn lexical_rows_filter_is_exact() {
        let store = seeded();
        let rows = lexical_rows(store.connection(), Some("前半")).expect("rows");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.category == "前半"));

        assert!(lexical_rows(store.connection(), Some("前")).expect("rows").is_empty());
    }

    #[test]
    fn empty_category_filter_is_not_the_same_as_none() {
        let store = seeded();
        let rows = lexical_rows(store.connection(), Some("")).expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "untitled");
    }

    #[test]
    fn embedding_rows_decode_vectors() {
        let store = seeded();
        let rows = embedding_rows(store.connection(), Some("後半")).expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].embedding, vec![-1.0, 0.0]);
    }

    #[test]
    fn embedding_rows_skip_corrupt_json() {
        let store = seeded();
        store
            .connection()
            .execute(
                "UPDATE documents SET embedding_json = 'garbage' WHERE id = 1",
                [],
            )
            .expect("corrupt row");
        let rows = embedding_rows(store.connection(), None).expect("rows");
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.row.id != 1));
    }

    #[test]
    fn get_document_returns_none_for_missing_id() {
        let store = seeded();
        assert!(get_document(store.connection(), 99).expect("query").is_none());
        let doc = get_document(store.connection(), 4)
            .expect("query")
            .expect("doc 4 exists");
        assert_eq!(doc.embedding, vec![0.8, 0.6]);
        assert_eq!(doc.title, "星座：牡牛座");
    }

    #[test]
    fn category_counts_group_by_exact_category() {
        let store = seeded();
        let counts = category_counts(store.connection()).expect("counts");
        assert_eq!(counts.get("前半"), Some(&2));
        assert_eq!(counts.get("後半"), Some(&1));
        assert_eq!(counts.get(""), Some(&1));
        assert_eq!(count_documents(store.connection()).expect("count"), 4);
    }
}
