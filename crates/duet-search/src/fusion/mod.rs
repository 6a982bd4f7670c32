//! Fusion of vector and lexical signals into one ranked result list.

pub mod hybrid;
pub mod scoring;

pub use hybrid::{hybrid_search, search_text};
pub use scoring::{
    DEFAULT_LIMIT, ScoredDocument, TEXT_WEIGHT, VECTOR_WEIGHT, fuse, hybrid_score, rank_order,
};
