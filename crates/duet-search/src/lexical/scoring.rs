//! Per-document lexical score.
//!
//! `text_score = max(exact, 0.6 * sim(title, q) + 0.4 * sim(text, q))`, where
//! `exact` is 1.0 when the lowercased query occurs literally in the lowercased
//! title or body. An empty query occurs in everything.

use super::trigram::{Trigram, set_similarity, trigram_set};
use anyhow::Result;
use duet_core::db::query::lexical_rows;
use duet_core::model::DocumentRow;
use rusqlite::Connection;
use std::collections::HashSet;

/// Weight of title similarity in the trigram score.
pub const TITLE_WEIGHT: f64 = 0.6;
/// Weight of body similarity in the trigram score.
pub const BODY_WEIGHT: f64 = 0.4;
/// Score of a literal, case-insensitive substring hit.
pub const EXACT_MATCH_SCORE: f64 = 1.0;

/// A query prepared once and scored against many documents.
#[derive(Debug, Clone)]
pub struct LexicalQuery {
    lowered: String,
    trigrams: HashSet<Trigram>,
}

impl LexicalQuery {
    #[must_use]
    pub fn new(query_text: &str) -> Self {
        Self {
            lowered: query_text.to_lowercase(),
            trigrams: trigram_set(query_text),
        }
    }

    /// Literal substring test against title and body; no wildcard syntax.
    #[must_use]
    pub fn is_exact_match(&self, title: &str, text: &str) -> bool {
        title.to_lowercase().contains(&self.lowered) || text.to_lowercase().contains(&self.lowered)
    }

    #[must_use]
    pub fn trigram_score(&self, title: &str, text: &str) -> f64 {
        TITLE_WEIGHT.mul_add(
            set_similarity(&trigram_set(title), &self.trigrams),
            BODY_WEIGHT * set_similarity(&trigram_set(text), &self.trigrams),
        )
    }

    #[must_use]
    pub fn text_score(&self, title: &str, text: &str) -> f64 {
        if self.is_exact_match(title, text) {
            return EXACT_MATCH_SCORE;
        }
        self.trigram_score(title, text).min(EXACT_MATCH_SCORE)
    }
}

/// A document from the lexical pass with its score, possibly zero.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalCandidate {
    pub row: DocumentRow,
    pub text_score: f64,
}

/// Score every document in `category` (or all documents) against the query.
///
/// # Errors
///
/// Returns an error if the documents cannot be read.
pub fn lexical_candidates(
    conn: &Connection,
    query_text: &str,
    category: Option<&str>,
) -> Result<Vec<LexicalCandidate>> {
    let query = LexicalQuery::new(query_text);
    let rows = lexical_rows(conn, category)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let text_score = query.text_score(&row.title, &row.text);
            LexicalCandidate { row, text_score }
        })
        .collect())
}
