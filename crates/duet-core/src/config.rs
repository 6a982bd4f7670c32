use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Project config location, relative to the project root.
pub const CONFIG_RELATIVE_PATH: &str = ".duet/config.toml";

/// Default document store location, relative to the project root.
pub const DEFAULT_STORE_PATH: &str = ".duet/duet.db";

/// Embedding model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Output dimensions of the embedding models duet knows about.
pub const MODEL_DIMENSIONS: &[(&str, usize)] = &[
    ("sentence-transformers/all-MiniLM-L6-v2", 384),
    ("sentence-transformers/paraphrase-MiniLM-L6-v2", 384),
    ("sentence-transformers/all-mpnet-base-v2", 768),
    ("intfloat/multilingual-e5-large", 1024),
];

pub const ENV_DB: &str = "DUET_DB";
pub const ENV_MODEL: &str = "DUET_MODEL";
pub const ENV_EMBEDDER: &str = "DUET_EMBEDDER";

/// Look up the output dimension of a known model.
#[must_use]
pub fn model_dimension(model: &str) -> Option<usize> {
    MODEL_DIMENSIONS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, dim)| *dim)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Which embedder implementation backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderBackend {
    /// Deterministic feature-hashing embedder, always available.
    #[default]
    Hash,
    /// ONNX Runtime sentence-transformer (requires the `semantic-ort` feature).
    Onnx,
}

impl EmbedderBackend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Onnx => "onnx",
        }
    }
}

impl fmt::Display for EmbedderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbedderBackend {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "onnx" | "ort" => Ok(Self::Onnx),
            other => Err(anyhow!(
                "unknown embedder backend '{other}' (expected 'hash' or 'onnx')"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbedderBackend,
    #[serde(default = "default_model")]
    pub model: String,
    /// Explicit output dimension; required for models missing from
    /// [`MODEL_DIMENSIONS`].
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Entries per memoization map; `0` disables caching.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbedderBackend::default(),
            model: default_model(),
            dimension: None,
            cache_capacity: default_cache_capacity(),
            model_dir: None,
        }
    }
}

impl EmbeddingConfig {
    /// The vector dimension this configuration produces.
    ///
    /// # Errors
    ///
    /// Returns an error when the model is unknown and no explicit dimension is
    /// configured, or when the configured dimension is zero.
    pub fn resolve_dimension(&self) -> Result<usize> {
        let dimension = match self.dimension {
            Some(dim) => dim,
            None => model_dimension(&self.model).ok_or_else(|| {
                anyhow!(
                    "unknown embedding model '{}'; set embedding.dimension in {CONFIG_RELATIVE_PATH}",
                    self.model
                )
            })?,
        };

        if dimension == 0 {
            return Err(anyhow!("embedding dimension must be positive"));
        }
        Ok(dimension)
    }

    /// Directory holding `model.onnx` and `tokenizer.json` for the ONNX backend.
    ///
    /// Defaults to `<os cache dir>/duet/models/<model name with '/' -> '--'>`.
    ///
    /// # Errors
    ///
    /// Returns an error if no model dir is configured and the OS cache
    /// directory cannot be determined.
    pub fn resolve_model_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.model_dir {
            return Ok(dir.clone());
        }

        let mut path = dirs::cache_dir().context("unable to determine OS cache directory")?;
        path.push("duet");
        path.push("models");
        path.push(self.model.replace('/', "--"));
        Ok(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

/// Values taken from the process environment, applied over the file config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub db: Option<String>,
    pub model: Option<String>,
    pub backend: Option<String>,
}

impl EnvOverrides {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            db: non_empty(env::var(ENV_DB).ok()),
            model: non_empty(env::var(ENV_MODEL).ok()),
            backend: non_empty(env::var(ENV_EMBEDDER).ok()),
        }
    }
}

/// Read `.duet/config.toml` under `project_root`, or defaults if it is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(CONFIG_RELATIVE_PATH);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the effective configuration.
///
/// Precedence (highest wins): `db_flag`, environment, config file, defaults.
/// A relative store path is resolved against `project_root`.
///
/// # Errors
///
/// Returns an error if the config file is invalid or an environment override
/// names an unknown backend.
pub fn resolve_config(project_root: &Path, db_flag: Option<&Path>) -> Result<ProjectConfig> {
    let file = load_project_config(project_root)?;
    let mut config = apply_overrides(file, &EnvOverrides::from_env())?;

    if let Some(db) = db_flag {
        config.store.path = db.to_path_buf();
    }
    if config.store.path.is_relative() {
        config.store.path = project_root.join(&config.store.path);
    }

    Ok(config)
}

fn apply_overrides(mut config: ProjectConfig, overrides: &EnvOverrides) -> Result<ProjectConfig> {
    if let Some(db) = &overrides.db {
        config.store.path = PathBuf::from(db);
    }
    if let Some(model) = &overrides.model {
        config.embedding.model.clone_from(model);
    }
    if let Some(backend) = &overrides.backend {
        config.embedding.backend = backend
            .parse()
            .with_context(|| format!("invalid {ENV_EMBEDDER} value"))?;
    }
    Ok(config)
}

/// Default contents written by `duet init`.
#[must_use]
pub fn default_config_toml() -> String {
    format!(
        "[store]\n\
         path = \"{DEFAULT_STORE_PATH}\"\n\
         \n\
         [embedding]\n\
         backend = \"hash\"\n\
         model = \"{DEFAULT_MODEL}\"\n\
         cache_capacity = {}\n\
         \n\
         [search]\n\
         default_limit = {}\n",
        default_cache_capacity(),
        default_limit()
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

const fn default_cache_capacity() -> usize {
    128
}

const fn default_limit() -> usize {
    10
}
