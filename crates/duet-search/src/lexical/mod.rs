//! Lexical scoring: trigram similarity plus literal substring matching.

pub mod scoring;
pub mod trigram;

pub use scoring::{LexicalCandidate, LexicalQuery, lexical_candidates};
pub use trigram::similarity;
