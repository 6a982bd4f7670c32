use crate::context::load_config;
use crate::output::{OutputMode, pretty_kv, render_mode};
use anyhow::{Context as _, Result};
use clap::Args;
use duet_core::config::{CONFIG_RELATIVE_PATH, default_config_toml};
use duet_core::db::DocumentStore;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.duet/config.toml` with the defaults.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    config: PathBuf,
    store: PathBuf,
    vector_dimension: usize,
    documents: u64,
}

/// Execute `duet init`. Creates the project skeleton:
///
/// ```text
/// .duet/
///   config.toml   (default project config)
///   duet.db       (empty document store, vector dimension fixed)
/// ```
///
/// An existing store is opened, not replaced; its documents survive
/// `--force`.
///
/// # Errors
///
/// Returns an error if the config already exists and `--force` is not set,
/// if any filesystem operation fails, or if an existing store was created
/// with a different vector dimension.
pub fn run_init(
    args: &InitArgs,
    db_flag: Option<&Path>,
    output: OutputMode,
    project_root: &Path,
) -> Result<()> {
    let config_path = project_root.join(CONFIG_RELATIVE_PATH);

    if config_path.exists() && !args.force {
        anyhow::bail!(
            "{CONFIG_RELATIVE_PATH} already exists. Use `duet init --force` to reinitialize."
        );
    }

    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }
    std::fs::write(&config_path, default_config_toml())
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let config = load_config(project_root, db_flag)?;
    let dimension = config.embedding.resolve_dimension()?;
    let store = DocumentStore::open(&config.store.path, dimension)?;
    let documents = store.count()?;
    info!(store = %config.store.path.display(), dimension, documents, "project initialized");

    let payload = InitOutput {
        config: config_path,
        store: config.store.path,
        vector_dimension: dimension,
        documents,
    };

    render_mode(output, &payload, render_init_text, render_init_human)
}

fn render_init_text(out: &InitOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(
        w,
        "initialized  config={}  store={}  dimension={}  documents={}",
        out.config.display(),
        out.store.display(),
        out.vector_dimension,
        out.documents
    )
}

fn render_init_human(out: &InitOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "✓ Initialized duet project.")?;
    writeln!(w)?;
    pretty_kv(w, "Config", out.config.display().to_string())?;
    pretty_kv(w, "Store", out.store.display().to_string())?;
    pretty_kv(w, "Dimension", out.vector_dimension.to_string())?;
    pretty_kv(w, "Documents", out.documents.to_string())?;
    writeln!(w)?;
    writeln!(w, "Next steps:")?;
    writeln!(w, "  Load documents:")?;
    writeln!(w, "    duet insert --file docs.json")?;
    writeln!(w)?;
    writeln!(w, "  Search them:")?;
    writeln!(w, "    duet search \"your query\"")
}
