//! Weighted score fusion of vector and lexical candidates.
//!
//! # Algorithm
//!
//! The two candidate lists are full-outer-joined on document id. A document
//! missing from one side gets 0 for that side's score. Rows whose scores sum
//! to zero are dropped, and the rest are scored as
//!
//! ```text
//! hybrid = 0.7 * vector_score + 0.3 * text_score
//! ```
//!
//! then sorted by `hybrid` descending with ties broken by ascending id, and
//! cut to `limit`.

use crate::lexical::LexicalCandidate;
use crate::semantic::VectorCandidate;
use chrono::{DateTime, Utc};
use duet_core::model::DocumentRow;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Weight of cosine similarity in the hybrid score.
pub const VECTOR_WEIGHT: f64 = 0.7;
/// Weight of the lexical score in the hybrid score.
pub const TEXT_WEIGHT: f64 = 0.3;
/// Result cap used when the caller does not give one.
pub const DEFAULT_LIMIT: usize = 10;

/// One ranked search hit with its score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// `1 - cosine distance`, or 0 if not a vector candidate.
    pub vector_score: f64,
    /// Lexical score, or 0 if not a lexical candidate.
    pub text_score: f64,
    pub hybrid_score: f64,
}

impl ScoredDocument {
    fn from_parts(row: DocumentRow, vector_score: f64, text_score: f64) -> Self {
        Self {
            created_at: row.created_at(),
            id: row.id,
            category: row.category,
            title: row.title,
            text: row.text,
            vector_score,
            text_score,
            hybrid_score: hybrid_score(vector_score, text_score),
        }
    }
}

#[must_use]
pub fn hybrid_score(vector_score: f64, text_score: f64) -> f64 {
    VECTOR_WEIGHT.mul_add(vector_score, TEXT_WEIGHT * text_score)
}

/// Join, score, order, and cut the two candidate lists.
#[must_use]
pub fn fuse(
    vector: Vec<VectorCandidate>,
    lexical: Vec<LexicalCandidate>,
    limit: usize,
) -> Vec<ScoredDocument> {
    if limit == 0 {
        return Vec::new();
    }

    let mut joined: BTreeMap<i64, (DocumentRow, f64, f64)> = BTreeMap::new();
    for candidate in vector {
        let score = candidate.vector_score();
        joined.insert(candidate.row.id, (candidate.row, score, 0.0));
    }
    for candidate in lexical {
        joined
            .entry(candidate.row.id)
            .and_modify(|entry| entry.2 = candidate.text_score)
            .or_insert((candidate.row, 0.0, candidate.text_score));
    }

    let mut scored: Vec<ScoredDocument> = joined
        .into_values()
        .filter(|(_, vector_score, text_score)| vector_score + text_score > 0.0)
        .map(|(row, vector_score, text_score)| {
            ScoredDocument::from_parts(row, vector_score, text_score)
        })
        .collect();

    scored.sort_by(rank_order);
    scored.truncate(limit);
    scored
}

/// Higher hybrid score first; equal scores by ascending id.
#[must_use]
pub fn rank_order(a: &ScoredDocument, b: &ScoredDocument) -> Ordering {
    b.hybrid_score
        .partial_cmp(&a.hybrid_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(id: i64) -> DocumentRow {
        DocumentRow {
            id,
            category: "c".into(),
            title: format!("doc {id}"),
            text: String::new(),
            created_at_us: 0,
        }
    }

    fn vec_hit(id: i64, distance: f64) -> VectorCandidate {
        VectorCandidate {
            row: row(id),
            distance,
        }
    }

    fn lex_hit(id: i64, text_score: f64) -> LexicalCandidate {
        LexicalCandidate {
            row: row(id),
            text_score,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn outer_join_defaults_missing_side_to_zero() {
        let fused = fuse(
            vec![vec_hit(1, 0.0)],
            vec![lex_hit(1, 0.5), lex_hit(2, 1.0)],
            10,
        );
        assert_eq!(fused.len(), 2);

        let both = fused.iter().find(|d| d.id == 1).expect("doc 1");
        assert!(close(both.vector_score, 1.0));
        assert!(close(both.text_score, 0.5));
        assert!(close(both.hybrid_score, 0.85));

        let lexical_only = fused.iter().find(|d| d.id == 2).expect("doc 2");
        assert!(close(lexical_only.vector_score, 0.0));
        assert!(close(lexical_only.hybrid_score, 0.3));
    }

    #[test]
    fn zero_score_rows_are_dropped() {
        let fused = fuse(Vec::new(), vec![lex_hit(1, 0.0), lex_hit(2, 0.2)], 10);
        let ids: Vec<i64> = fused.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn ties_break_by_ascending_id() {
        let fused = fuse(
            Vec::new(),
            vec![lex_hit(7, 1.0), lex_hit(3, 1.0), lex_hit(5, 1.0)],
            10,
        );
        let ids: Vec<i64> = fused.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 5, 7]);
    }

    #[test]
    fn vector_weight_dominates_text_weight() {
        let fused = fuse(vec![vec_hit(2, 0.0)], vec![lex_hit(1, 1.0)], 10);
        assert_eq!(fused[0].id, 2);
    }

    #[test]
    fn zero_limit_returns_nothing() {
        assert!(fuse(vec![vec_hit(1, 0.0)], Vec::new(), 0).is_empty());
    }

    proptest! {
        #[test]
        fn output_is_sorted_bounded_and_nonzero(
            distances in proptest::collection::vec(0.0_f64..0.5, 0..20),
            text_scores in proptest::collection::vec(0.0_f64..=1.0, 0..40),
            limit in 0_usize..30,
        ) {
            let vector: Vec<_> = distances
                .iter()
                .enumerate()
                .map(|(i, d)| vec_hit(i64::try_from(i * 2).unwrap_or(0), *d))
                .collect();
            let lexical: Vec<_> = text_scores
                .iter()
                .enumerate()
                .map(|(i, s)| lex_hit(i64::try_from(i).unwrap_or(0), *s))
                .collect();

            let fused = fuse(vector, lexical, limit);
            prop_assert!(fused.len() <= limit);
            for pair in fused.windows(2) {
                prop_assert!(pair[0].hybrid_score >= pair[1].hybrid_score);
                if pair[0].hybrid_score.total_cmp(&pair[1].hybrid_score).is_eq() {
                    prop_assert!(pair[0].id < pair[1].id);
                }
            }
            for doc in &fused {
                prop_assert!(doc.vector_score + doc.text_score > 0.0);
                prop_assert!(close(
                    doc.hybrid_score,
                    0.7 * doc.vector_score + 0.3 * doc.text_score
                ));
            }
        }
    }
}
