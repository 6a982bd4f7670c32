//! `duet search`: hybrid vector + trigram search over stored documents.
//!
//! The query text is embedded with the configured embedder and the same text
//! drives the lexical pass. Scores are `0.7 * vector + 0.3 * text`.

use crate::context::AppContext;
use crate::output::{OutputMode, render_mode};
use clap::Args;
use clap::builder::RangedU64ValueParser;
use duet_search::{ScoredDocument, search_text};
use serde::Serialize;
use std::io::Write;

/// Upper bound on `--limit`; larger values are rejected at parse time.
const MAX_LIMIT: u64 = 1000;

#[derive(Args, Debug)]
#[command(
    about = "Search documents with hybrid vector + trigram ranking",
    after_help = "EXAMPLES:\n    # Search everything\n    duet search \"red supergiant\"\n\n\
                  # Restrict to one category\n    duet search アンタレス -c 後半\n\n\
                  # Machine-readable output\n    duet search antares -n 3 --format json"
)]
pub struct SearchArgs {
    /// Search query, used both for the embedding and for trigram matching.
    pub query: String,

    /// Only return documents in this exact category.
    #[arg(short, long)]
    pub category: Option<String>,

    /// Maximum number of results to return, at most 1000 (defaults to
    /// `search.default_limit`).
    #[arg(
        short = 'n',
        long,
        value_parser = RangedU64ValueParser::<usize>::new().range(0..=MAX_LIMIT)
    )]
    pub limit: Option<usize>,
}

/// JSON envelope for search output.
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub count: usize,
    /// Best match first.
    pub results: Vec<ScoredDocument>,
}

/// Execute `duet search <query>`.
///
/// An empty query is allowed: every document is then a lexical match.
///
/// # Errors
///
/// Returns an error if embedding the query or reading the store fails.
pub fn run_search(args: &SearchArgs, ctx: &AppContext, output: OutputMode) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or_else(|| {
        ctx.config
            .search
            .default_limit
            .min(usize::try_from(MAX_LIMIT).unwrap_or(usize::MAX))
    });

    let results = search_text(
        &ctx.store,
        ctx.embedder.as_ref(),
        &args.query,
        args.category.as_deref(),
        limit,
    )?;

    let search_output = SearchOutput {
        query: args.query.clone(),
        category: args.category.clone(),
        count: results.len(),
        results,
    };

    render_mode(
        output,
        &search_output,
        |out, w| render_search_text(out, w),
        |out, w| render_search_human(out, w),
    )
}

/// Render search results in human-readable format.
fn render_search_human(out: &SearchOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if out.results.is_empty() {
        writeln!(w, "No results for '{}'", out.query)?;
        if out.category.is_some() {
            writeln!(w, "Try again without --category")?;
        }
        return Ok(());
    }

    writeln!(w, "{} result(s) for '{}':", out.count, out.query)?;
    writeln!(w, "{:-<90}", "")?;
    writeln!(
        w,
        "{:>6}  {:>7}  {:>7}  {:>7}  {:<10}  TITLE",
        "ID", "HYBRID", "VECTOR", "TEXT", "CATEGORY"
    )?;
    writeln!(w, "{:-<90}", "")?;

    for result in &out.results {
        writeln!(
            w,
            "{:>6}  {:>7.3}  {:>7.3}  {:>7.3}  {:<10}  {}",
            result.id,
            result.hybrid_score,
            result.vector_score,
            result.text_score,
            result.category,
            result.title
        )?;
    }

    Ok(())
}

fn render_search_text(out: &SearchOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if out.results.is_empty() {
        writeln!(w, "advice  no-results  query={}", out.query)?;
        return Ok(());
    }

    for result in &out.results {
        writeln!(
            w,
            "{}  score={:.3}  vector={:.3}  text={:.3}  {}  {}",
            result.id,
            result.hybrid_score,
            result.vector_score,
            result.text_score,
            result.category,
            result.title
        )?;
    }
    Ok(())
}
