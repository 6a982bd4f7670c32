//! `duet embed` / `duet embed-batch`: expose the configured embedder.

use crate::output::{OutputMode, pretty_kv, render_mode};
use anyhow::Result;
use clap::Args;
use duet_search::Embedder;
use serde::Serialize;
use std::io::Write;

/// Components shown per vector in pretty output.
const PREVIEW_LEN: usize = 8;

#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// Text to embed.
    pub text: String,
}

#[derive(Args, Debug)]
pub struct EmbedBatchArgs {
    /// Texts to embed, one vector per argument in order.
    #[arg(required = true)]
    pub texts: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EmbedOutput {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct EmbedBatchOutput {
    embeddings: Vec<Vec<f32>>,
}

/// Execute `duet embed <text>`.
///
/// # Errors
///
/// Returns an error if the embedder fails.
pub fn run_embed(args: &EmbedArgs, embedder: &dyn Embedder, output: OutputMode) -> Result<()> {
    let payload = EmbedOutput {
        embedding: embedder.embed(&args.text)?,
    };
    render_mode(
        output,
        &payload,
        |out, w| write_vector_line(&out.embedding, w),
        |out, w| {
            pretty_kv(w, "Dimension", out.embedding.len().to_string())?;
            pretty_kv(w, "Vector", preview(&out.embedding))
        },
    )
}

/// Execute `duet embed-batch <text>...`.
///
/// # Errors
///
/// Returns an error if the embedder fails on any text.
pub fn run_embed_batch(
    args: &EmbedBatchArgs,
    embedder: &dyn Embedder,
    output: OutputMode,
) -> Result<()> {
    let texts: Vec<&str> = args.texts.iter().map(String::as_str).collect();
    let payload = EmbedBatchOutput {
        embeddings: embedder.embed_batch(&texts)?,
    };
    render_mode(
        output,
        &payload,
        |out, w| {
            for vector in &out.embeddings {
                write_vector_line(vector, w)?;
            }
            Ok(())
        },
        |out, w| {
            pretty_kv(w, "Vectors", out.embeddings.len().to_string())?;
            for (text, vector) in texts.iter().zip(&out.embeddings) {
                writeln!(w, "{text}")?;
                writeln!(w, "  {}", preview(vector))?;
            }
            Ok(())
        },
    )
}

fn write_vector_line(vector: &[f32], w: &mut dyn Write) -> std::io::Result<()> {
    let line: Vec<String> = vector.iter().map(f32::to_string).collect();
    writeln!(w, "{}", line.join(" "))
}

fn preview(vector: &[f32]) -> String {
    let head: Vec<String> = vector
        .iter()
        .take(PREVIEW_LEN)
        .map(|v| format!("{v:.4}"))
        .collect();
    if vector.len() > PREVIEW_LEN {
        format!("[{}, …]", head.join(", "))
    } else {
        format!("[{}]", head.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_vectors() {
        let long = vec![0.5_f32; 20];
        let shown = preview(&long);
        assert!(shown.ends_with(", …]"));
        assert_eq!(shown.matches("0.5000").count(), PREVIEW_LEN);
    }

    #[test]
    fn preview_keeps_short_vectors_whole() {
        assert_eq!(preview(&[1.0, -0.25]), "[1.0000, -0.2500]");
    }

    #[test]
    fn vector_line_is_space_separated() {
        let mut buf = Vec::new();
        write_vector_line(&[1.0, 0.5], &mut buf).expect("write");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "1 0.5\n");
    }
}
