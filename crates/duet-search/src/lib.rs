#![forbid(unsafe_code)]
//! duet-search library.
//!
//! Text embedding and hybrid retrieval over a [`duet_core::db::DocumentStore`]:
//!
//! - [`semantic`]: the [`Embedder`] trait, its hash and ONNX backends, the
//!   memoizing cache, and cosine vector candidates.
//! - [`lexical`]: pg_trgm-style trigram similarity and exact-substring scoring.
//! - [`fusion`]: the weighted hybrid ranker.
//! - [`loader`]: embed-and-insert for new documents.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod error;
pub mod fusion;
pub mod lexical;
pub mod loader;
pub mod semantic;

pub use error::EmbedError;
pub use fusion::{ScoredDocument, hybrid_search, search_text};
pub use loader::BulkLoader;
pub use semantic::{CachedEmbedder, Embedder, HashEmbedder, build_embedder};
