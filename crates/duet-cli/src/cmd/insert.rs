//! `duet insert`: embed and bulk-load documents from a JSON payload.

use crate::context::AppContext;
use crate::output::{OutputMode, render};
use anyhow::{Context as _, Result};
use clap::Args;
use duet_core::model::NewDocument;
use duet_search::BulkLoader;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
#[command(
    after_help = "INPUT FORMAT:\n    {\"items\": [{\"category\": \"...\", \"title\": \"...\", \"text\": \"...\"}]}"
)]
pub struct InsertArgs {
    /// JSON file to read; `-` or omitted reads stdin.
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

/// Request body accepted by `duet insert`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InsertRequest {
    pub items: Vec<NewDocument>,
}

#[derive(Debug, Serialize)]
struct InsertOutput {
    inserted: usize,
    total: u64,
}

/// Execute `duet insert`.
///
/// All items land in one transaction or none do.
///
/// # Errors
///
/// Returns an error if the input cannot be read or parsed, embedding fails,
/// or the store rejects the batch.
pub fn run_insert(args: &InsertArgs, ctx: &mut AppContext, output: OutputMode) -> Result<()> {
    let raw = read_input(args.file.as_deref())?;
    let request = parse_request(&raw)?;

    let inserted = BulkLoader::new(ctx.embedder.as_ref(), &mut ctx.store).load(&request.items)?;
    let payload = InsertOutput {
        inserted,
        total: ctx.store.count()?,
    };

    render(output, &payload, |out, w| {
        writeln!(w, "inserted {} document(s); {} total", out.inserted, out.total)
    })
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read documents from stdin")?;
            Ok(buf)
        }
    }
}

/// Parse an `{"items": [...]}` payload.
///
/// # Errors
///
/// Returns an error naming the JSON problem.
pub fn parse_request(raw: &str) -> Result<InsertRequest> {
    serde_json::from_str(raw).context("invalid insert payload; expected {\"items\": [...]}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_items_in_order() {
        let request = parse_request(
            r#"{"items": [
                {"category": "前半", "title": "星座：牡羊座", "text": "3/21-4/19."},
                {"category": "後半", "title": "星座：天秤座", "text": "9/23-10/23."}
            ]}"#,
        )
        .expect("parse");
        assert_eq!(request.items.len(), 2);
        assert_eq!(request.items[0].title, "星座：牡羊座");
        assert_eq!(request.items[1].category, "後半");
    }

    #[test]
    fn empty_items_is_valid() {
        let request = parse_request(r#"{"items": []}"#).expect("parse");
        assert!(request.items.is_empty());
    }

    #[test]
    fn missing_field_is_rejected() {
        let err = parse_request(r#"{"items": [{"category": "c", "title": "t"}]}"#)
            .expect_err("text is required");
        assert!(format!("{err:#}").contains("text"));
    }

    #[test]
    fn bare_array_is_rejected() {
        assert!(parse_request(r#"[{"category": "c", "title": "t", "text": "x"}]"#).is_err());
    }

    #[test]
    fn reads_named_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("docs.json");
        std::fs::write(&path, r#"{"items": []}"#).expect("write");
        assert_eq!(read_input(Some(&path)).expect("read"), r#"{"items": []}"#);
    }
}
