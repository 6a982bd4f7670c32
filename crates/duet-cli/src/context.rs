//! Process-wide state built once in `main` and handed to command handlers.

use anyhow::{Context as _, Result};
use duet_core::config::{ProjectConfig, resolve_config};
use duet_core::db::DocumentStore;
use duet_core::error::StoreError;
use duet_search::{Embedder, build_embedder};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Resolved config, the cached embedder, and the open document store.
pub struct AppContext {
    pub config: ProjectConfig,
    pub embedder: Arc<dyn Embedder>,
    pub store: DocumentStore,
}

impl AppContext {
    /// Open an initialized project.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SchemaMissing`] when the store file does not
    /// exist, [`StoreError::DimensionMismatch`] when the configured embedder
    /// disagrees with the store, or any config/embedder load failure.
    pub fn open(project_root: &Path, db_flag: Option<&Path>) -> Result<Self> {
        let config = load_config(project_root, db_flag)?;
        let embedder = build_embedder(&config.embedding)?;

        let store = DocumentStore::open_existing(&config.store.path)
            .with_context(|| format!("open document store {}", config.store.path.display()))?
            .ok_or(StoreError::SchemaMissing)?;
        store.ensure_dimension(embedder.dimension())?;

        debug!(
            store = %config.store.path.display(),
            dimension = store.vector_dimension(),
            model = embedder.model_name(),
            "app context ready"
        );
        Ok(Self {
            config,
            embedder,
            store,
        })
    }
}

/// Config and embedder only, for commands that never touch the store.
///
/// # Errors
///
/// Returns an error if the config is invalid or the embedder fails to load.
pub fn open_embedder(project_root: &Path, db_flag: Option<&Path>) -> Result<Arc<dyn Embedder>> {
    let config = load_config(project_root, db_flag)?;
    build_embedder(&config.embedding)
}

/// Resolve the effective project config.
///
/// # Errors
///
/// Returns an error if the config file or an environment override is invalid.
pub fn load_config(project_root: &Path, db_flag: Option<&Path>) -> Result<ProjectConfig> {
    resolve_config(project_root, db_flag)
}
