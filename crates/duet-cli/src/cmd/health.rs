//! `duet health`: check that the store opens and agrees with the embedder.

use std::io::Write;
use std::path::{Path, PathBuf};

use duet_core::config::{EmbedderBackend, ProjectConfig};
use duet_core::db::{DocumentStore, vector_extension_available};
use duet_search::build_embedder;
use duet_search::semantic::{ModelFiles, is_onnx_available};
use serde::Serialize;

use crate::context::load_config;
use crate::output::{OutputMode, pretty_kv, pretty_section, render};

#[derive(Debug, Serialize)]
struct HealthOutput {
    healthy: bool,
    store: PathBuf,
    store_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    store_dimension: Option<usize>,
    backend: String,
    model: String,
    embedder_dimension: usize,
    dimension_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedder_error: Option<String>,
    onnx_runtime: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_files: Option<ModelFilesReport>,
    vector_extension: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    documents: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ModelFilesReport {
    model: PathBuf,
    tokenizer: PathBuf,
    sha256: String,
}

/// Execute `duet health`.
///
/// The report is always rendered; the command then fails if the store is
/// missing, the embedder cannot load, or the two dimensions differ.
///
/// # Errors
///
/// Returns an error if the project is unhealthy or the config cannot be
/// loaded.
pub fn run_health(
    db_flag: Option<&Path>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let config = load_config(project_root, db_flag)?;
    let payload = collect_health(&config)?;

    render(output, &payload, |report, w| render_health_human(report, w))?;

    if !payload.healthy {
        anyhow::bail!("document store is unhealthy");
    }
    Ok(())
}

fn collect_health(config: &ProjectConfig) -> anyhow::Result<HealthOutput> {
    let embedder_dimension = config.embedding.resolve_dimension()?;
    let embedder_error = build_embedder(&config.embedding)
        .err()
        .map(|err| format!("{err:#}"));
    let model_files = match config.embedding.backend {
        EmbedderBackend::Hash => None,
        EmbedderBackend::Onnx => locate_model_files(config)?,
    };

    let store = DocumentStore::open_existing(&config.store.path)?;
    let store_dimension = store.as_ref().map(DocumentStore::vector_dimension);
    let dimension_match = store_dimension == Some(embedder_dimension);
    let documents = store.as_ref().map(DocumentStore::count).transpose()?;
    let vector_extension = store
        .as_ref()
        .is_some_and(|s| vector_extension_available(s.connection()));

    Ok(HealthOutput {
        healthy: store.is_some() && dimension_match && embedder_error.is_none(),
        store: config.store.path.clone(),
        store_exists: store.is_some(),
        store_dimension,
        backend: config.embedding.backend.to_string(),
        model: config.embedding.model.clone(),
        embedder_dimension,
        dimension_match,
        embedder_error,
        onnx_runtime: is_onnx_available(),
        model_files,
        vector_extension,
        documents,
    })
}

/// Model files for the ONNX backend, fingerprinted; `None` when absent.
fn locate_model_files(config: &ProjectConfig) -> anyhow::Result<Option<ModelFilesReport>> {
    let dir = config.embedding.resolve_model_dir()?;
    let Ok(files) = ModelFiles::locate(&dir) else {
        return Ok(None);
    };
    let sha256 = files.fingerprint()?;
    Ok(Some(ModelFilesReport {
        model: files.model,
        tokenizer: files.tokenizer,
        sha256,
    }))
}

fn render_health_human(report: &HealthOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let store_status = if report.store_exists {
        "✓ present"
    } else {
        "⚠ missing (run `duet init`)"
    };
    let dimension_status = match report.store_dimension {
        Some(dim) if report.dimension_match => format!("✓ {dim}"),
        Some(dim) => format!(
            "⚠ store {dim}, embedder {}",
            report.embedder_dimension
        ),
        None => "-".to_owned(),
    };
    let extension_status = if report.vector_extension {
        "✓ sqlite-vec"
    } else {
        "◐ Rust scan fallback"
    };

    pretty_section(w, "duet health")?;
    pretty_kv(w, "Store", format!("{store_status}  {}", report.store.display()))?;
    pretty_kv(w, "Embedder", format!("{} ({})", report.model, report.backend))?;
    if let Some(error) = &report.embedder_error {
        pretty_kv(w, "Load error", format!("⚠ {error}"))?;
    }
    pretty_kv(w, "Dimension", dimension_status)?;
    pretty_kv(w, "Vectors", extension_status)?;
    pretty_kv(
        w,
        "ONNX runtime",
        if report.onnx_runtime { "✓ built in" } else { "- not built in" },
    )?;
    if let Some(files) = &report.model_files {
        pretty_kv(w, "Model", files.model.display().to_string())?;
        pretty_kv(w, "SHA-256", &files.sha256)?;
    }
    if let Some(documents) = report.documents {
        pretty_kv(w, "Documents", documents.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn report(store_dimension: Option<usize>) -> HealthOutput {
        HealthOutput {
            healthy: store_dimension == Some(384),
            store: PathBuf::from(".duet/duet.db"),
            store_exists: store_dimension.is_some(),
            store_dimension,
            backend: "hash".into(),
            model: "sentence-transformers/all-MiniLM-L6-v2".into(),
            embedder_dimension: 384,
            dimension_match: store_dimension == Some(384),
            embedder_error: None,
            onnx_runtime: false,
            model_files: None,
            vector_extension: false,
            documents: store_dimension.map(|_| 3),
        }
    }

    #[test]
    fn healthy_report_shows_dimension() {
        let mut buf = Vec::new();
        render_health_human(&report(Some(384)), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("✓ 384"));
        assert!(text.contains("Documents:   3"));
    }

    #[test]
    fn mismatch_names_both_dimensions() {
        let mut buf = Vec::new();
        render_health_human(&report(Some(768)), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("store 768, embedder 384"));
    }

    #[test]
    fn missing_store_suggests_init() {
        let mut buf = Vec::new();
        render_health_human(&report(None), &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("duet init"));
        assert!(!text.contains("Documents"));
    }

    #[test]
    fn uninitialized_project_is_unhealthy() {
        let root = tempfile::tempdir().expect("tempdir");
        let db = root.path().join("missing.db");
        let result = run_health(Some(&db), OutputMode::Json, root.path());
        assert!(result.is_err());
    }

    #[test]
    fn hash_backend_with_store_is_healthy() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut config = ProjectConfig::default();
        config.store.path = root.path().join("docs.db");
        config.embedding.dimension = Some(8);
        drop(DocumentStore::open(&config.store.path, 8).expect("create store"));

        let health = collect_health(&config).expect("collect");
        assert!(health.healthy);
        assert_eq!(health.documents, Some(0));
        assert!(health.model_files.is_none());
        assert!(health.embedder_error.is_none());
    }

    #[test]
    fn onnx_backend_reports_model_fingerprint() {
        let root = tempfile::tempdir().expect("tempdir");
        let model_dir = root.path().join("model");
        fs::create_dir_all(&model_dir).expect("mkdir");
        fs::write(model_dir.join("model.onnx"), b"abc").expect("write model");
        fs::write(model_dir.join("tokenizer.json"), b"{}").expect("write tokenizer");

        let mut config = ProjectConfig::default();
        config.store.path = root.path().join("docs.db");
        config.embedding.backend = EmbedderBackend::Onnx;
        config.embedding.dimension = Some(4);
        config.embedding.model_dir = Some(model_dir);
        drop(DocumentStore::open(&config.store.path, 4).expect("create store"));

        let health = collect_health(&config).expect("collect");
        let files = health.model_files.as_ref().expect("model files located");
        assert_eq!(
            files.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(files.model.ends_with("model.onnx"));
        assert_eq!(health.onnx_runtime, is_onnx_available());
        // Three bytes are not a loadable model with or without the runtime.
        assert!(health.embedder_error.is_some());
        assert!(!health.healthy);

        let mut buf = Vec::new();
        render_health_human(&health, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.contains("SHA-256"));
        assert!(text.contains("ba7816bf"));
    }

    #[test]
    fn onnx_backend_without_files_is_unhealthy_but_reported() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut config = ProjectConfig::default();
        config.store.path = root.path().join("docs.db");
        config.embedding.backend = EmbedderBackend::Onnx;
        config.embedding.dimension = Some(4);
        config.embedding.model_dir = Some(root.path().join("no-model"));
        drop(DocumentStore::open(&config.store.path, 4).expect("create store"));

        let health = collect_health(&config).expect("collect");
        assert!(health.model_files.is_none());
        let error = health.embedder_error.as_deref().expect("load error recorded");
        assert!(error.contains("model.onnx"));
        assert!(!health.healthy);
    }
}
