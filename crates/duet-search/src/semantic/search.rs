//! Cosine vector candidates over stored document embeddings.
//!
//! The query vector is compared with `documents.embedding_json`. When the
//! sqlite-vec extension is loaded the distance is computed in SQL with
//! `vec_distance_cosine`; otherwise every row in scope is decoded and scored
//! in Rust with the same single-precision formula, so both paths rank alike.

use anyhow::{Context, Result};
use duet_core::db::DocumentStore;
use duet_core::db::embedding::encode_embedding_json;
use duet_core::db::query::embedding_rows;
use duet_core::db::vector_extension_available;
use duet_core::model::DocumentRow;
use rusqlite::{Connection, named_params};
use std::cmp::Ordering;
use tracing::debug;

/// Candidates must be strictly closer than this cosine distance.
pub const MAX_COSINE_DISTANCE: f64 = 0.5;
/// At most this many vector candidates enter fusion.
pub const VECTOR_CANDIDATE_CAP: usize = 100;

/// A document inside the cosine distance threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorCandidate {
    pub row: DocumentRow,
    pub distance: f64,
}

impl VectorCandidate {
    /// `1 - distance`, in `(0.5, 1]` for every candidate.
    #[must_use]
    pub fn vector_score(&self) -> f64 {
        1.0 - self.distance
    }
}

/// Vector candidates for `query`, nearest first, ties by id, capped.
///
/// A zero-norm query has no defined direction and yields no candidates.
///
/// # Errors
///
/// Returns [`duet_core::error::StoreError::DimensionMismatch`] if the query
/// length differs from the store's dimension, or an error if reading fails.
pub fn vector_candidates(
    store: &DocumentStore,
    query: &[f32],
    category: Option<&str>,
) -> Result<Vec<VectorCandidate>> {
    store.ensure_dimension(query.len())?;
    if !has_direction(query) {
        debug!("zero-norm query vector; no vector candidates");
        return Ok(Vec::new());
    }

    let conn = store.connection();
    if vector_extension_available(conn) {
        return vector_candidates_sqlite_vec(conn, query, category);
    }
    vector_candidates_scan(conn, query, category)
}

/// SQL path: requires sqlite-vec on `conn`.
///
/// Rows whose stored JSON is not an array of numbers with the query's
/// length get a NULL distance and drop out, matching what the scan skips.
/// `CASE` evaluates its branches in order, so the JSON functions after
/// `json_valid` never see malformed text.
///
/// # Errors
///
/// Returns an error if the extension is missing or the query fails.
pub fn vector_candidates_sqlite_vec(
    conn: &Connection,
    query: &[f32],
    category: Option<&str>,
) -> Result<Vec<VectorCandidate>> {
    let query_json = encode_embedding_json(query)?;
    let cap = i64::try_from(VECTOR_CANDIDATE_CAP).unwrap_or(i64::MAX);

    let mut stmt = conn
        .prepare_cached(
            "SELECT id, category, title, text, created_at_us, distance
             FROM (
                 SELECT id, category, title, text, created_at_us,
                        CASE
                            WHEN NOT json_valid(embedding_json) THEN NULL
                            WHEN json_type(embedding_json) = 'array'
                                 AND json_array_length(embedding_json) = json_array_length(:query)
                                 AND NOT EXISTS (
                                     SELECT 1 FROM json_each(embedding_json)
                                     WHERE type NOT IN ('integer', 'real')
                                 )
                            THEN vec_distance_cosine(vec_f32(embedding_json), vec_f32(:query))
                        END AS distance
                 FROM documents
                 WHERE (:category IS NULL OR category = :category)
             )
             WHERE distance IS NOT NULL AND distance < :max_distance
             ORDER BY distance ASC, id ASC
             LIMIT :cap",
        )
        .context("prepare sqlite-vec candidate query")?;

    let rows = stmt
        .query_map(
            named_params! {
                ":query": query_json,
                ":category": category,
                ":max_distance": MAX_COSINE_DISTANCE,
                ":cap": cap,
            },
            |row| {
                Ok(VectorCandidate {
                    row: DocumentRow {
                        id: row.get(0)?,
                        category: row.get(1)?,
                        title: row.get(2)?,
                        text: row.get(3)?,
                        created_at_us: row.get(4)?,
                    },
                    distance: row.get(5)?,
                })
            },
        )
        .context("execute sqlite-vec candidate query")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read sqlite-vec candidate rows")?;

    debug!(candidates = rows.len(), "vector candidates via sqlite-vec");
    Ok(rows)
}

/// Pure-Rust path: decode every embedding in scope and score it.
///
/// # Errors
///
/// Returns an error if the rows cannot be read.
pub fn vector_candidates_scan(
    conn: &Connection,
    query: &[f32],
    category: Option<&str>,
) -> Result<Vec<VectorCandidate>> {
    let mut scored: Vec<VectorCandidate> = embedding_rows(conn, category)?
        .into_iter()
        .filter_map(|stored| {
            let distance = cosine_distance(query, &stored.embedding)?;
            (distance < MAX_COSINE_DISTANCE).then_some(VectorCandidate {
                row: stored.row,
                distance,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.row.id.cmp(&b.row.id))
    });
    scored.truncate(VECTOR_CANDIDATE_CAP);

    debug!(candidates = scored.len(), "vector candidates via Rust scan");
    Ok(scored)
}

/// Cosine distance `1 - a·b / (|a||b|)`.
///
/// Accumulates in `f32` like sqlite-vec's `vec_distance_cosine`. Returns
/// `None` for mismatched lengths, empty input, or a zero-norm side.
#[must_use]
pub fn cosine_distance(left: &[f32], right: &[f32]) -> Option<f64> {
    if left.len() != right.len() || left.is_empty() {
        return None;
    }

    let mut dot = 0.0_f32;
    let mut left_norm_sq = 0.0_f32;
    let mut right_norm_sq = 0.0_f32;
    for (a, b) in left.iter().zip(right) {
        dot += a * b;
        left_norm_sq += a * a;
        right_norm_sq += b * b;
    }

    let denom = left_norm_sq.sqrt() * right_norm_sq.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some(f64::from(1.0 - dot / denom))
}

fn has_direction(vector: &[f32]) -> bool {
    vector.iter().any(|v| *v != 0.0)
}
