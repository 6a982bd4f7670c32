//! JSON text encoding for stored embeddings.
//!
//! `[0.1,0.2,...]` is both what `serde_json` produces for `&[f32]` and what
//! sqlite-vec's `vec_f32()` parses, so one column serves both search paths.

use anyhow::{Context, Result, bail};

/// Encode a vector as a JSON array.
///
/// # Errors
///
/// Returns an error if any component is NaN or infinite; JSON cannot
/// represent those and cosine distance is undefined for them.
pub fn encode_embedding_json(embedding: &[f32]) -> Result<String> {
    if let Some(idx) = embedding.iter().position(|value| !value.is_finite()) {
        bail!("embedding component {idx} is not finite");
    }
    serde_json::to_string(embedding).context("serialize embedding as JSON")
}

/// Decode a stored JSON array back into floats.
///
/// # Errors
///
/// Returns an error if the text is not a JSON array of numbers.
pub fn decode_embedding_json(encoded: &str) -> Result<Vec<f32>> {
    serde_json::from_str(encoded).context("parse stored embedding JSON")
}
