//! `duet stats`: document counts.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use crate::context::AppContext;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Report payload for `duet stats`.
#[derive(Debug, serde::Serialize)]
pub struct StoreStats {
    pub store: PathBuf,
    pub vector_dimension: usize,
    pub total: u64,
    pub by_category: BTreeMap<String, u64>,
}

/// Execute `duet stats`.
///
/// # Errors
///
/// Returns an error if the store cannot be queried.
pub fn run_stats(ctx: &AppContext, output: OutputMode) -> anyhow::Result<()> {
    let payload = StoreStats {
        store: ctx.config.store.path.clone(),
        vector_dimension: ctx.store.vector_dimension(),
        total: ctx.store.count()?,
        by_category: ctx.store.count_by_category()?,
    };

    render_mode(output, &payload, render_stats_text, render_stats_human)
}

fn render_stats_text(stats: &StoreStats, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "total  {}", stats.total)?;
    for (category, count) in &stats.by_category {
        writeln!(w, "category  {category}  {count}")?;
    }
    Ok(())
}

fn render_stats_human(stats: &StoreStats, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Document store")?;
    pretty_kv(w, "Path", stats.store.display().to_string())?;
    pretty_kv(w, "Dimension", stats.vector_dimension.to_string())?;
    pretty_kv(w, "Documents", stats.total.to_string())?;

    if stats.by_category.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    pretty_section(w, "By category")?;
    for (category, count) in &stats.by_category {
        writeln!(w, "{count:>8}  {category}")?;
    }
    Ok(())
}
