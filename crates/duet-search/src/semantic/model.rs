use super::{Embedder, check_vector};
use crate::error::EmbedError;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

#[cfg(feature = "semantic-ort")]
use anyhow::{anyhow, bail};
#[cfg(feature = "semantic-ort")]
use ndarray::Array2;
#[cfg(feature = "semantic-ort")]
use ort::{inputs, session::Session, value::Value};
#[cfg(feature = "semantic-ort")]
use std::sync::{Mutex, PoisonError};
#[cfg(feature = "semantic-ort")]
use tokenizers::Tokenizer;

const QUANTIZED_MODEL_FILENAME: &str = "model_quantized.onnx";
const MODEL_FILENAME: &str = "model.onnx";
const TOKENIZER_FILENAME: &str = "tokenizer.json";

#[cfg(feature = "semantic-ort")]
const MAX_TOKENS: usize = 512;

/// Files making up an exported sentence-transformer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    /// Find the model and tokenizer in `dir`, preferring the quantized export.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::ModelUnavailable`] naming the missing file.
    pub fn locate(dir: &Path) -> Result<Self, EmbedError> {
        let quantized = dir.join(QUANTIZED_MODEL_FILENAME);
        let plain = dir.join(MODEL_FILENAME);
        let model = if quantized.is_file() {
            quantized
        } else if plain.is_file() {
            plain
        } else {
            return Err(EmbedError::ModelUnavailable(format!(
                "no {MODEL_FILENAME} or {QUANTIZED_MODEL_FILENAME} in {}",
                dir.display()
            )));
        };

        let tokenizer = dir.join(TOKENIZER_FILENAME);
        if !tokenizer.is_file() {
            return Err(EmbedError::ModelUnavailable(format!(
                "no {TOKENIZER_FILENAME} in {}",
                dir.display()
            )));
        }

        Ok(Self { model, tokenizer })
    }

    /// SHA-256 of the model weights, hex encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file cannot be read.
    pub fn fingerprint(&self) -> Result<String> {
        let file = File::open(&self.model)
            .with_context(|| format!("open model {}", self.model.display()))?;
        let mut reader = BufReader::new(file);
        let mut hasher = Sha256::new();
        let mut buf = [0_u8; 64 * 1024];
        loop {
            let read = reader
                .read(&mut buf)
                .with_context(|| format!("read model {}", self.model.display()))?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}

/// Sentence-transformer embedder on ONNX Runtime.
///
/// Inference takes `&mut Session`, so the session sits behind a mutex and
/// calls are serialized. Batches are encoded one text at a time through the
/// same path as [`Embedder::embed`], which keeps batch and single results
/// bit-identical.
pub struct OnnxEmbedder {
    #[cfg(feature = "semantic-ort")]
    session: Mutex<Session>,
    #[cfg(feature = "semantic-ort")]
    tokenizer: Tokenizer,
    model_name: String,
    dimension: usize,
}

impl OnnxEmbedder {
    /// Load the model files from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`EmbedError::ModelUnavailable`] when the files are missing or
    /// the crate was built without `semantic-ort`, or an error if ONNX Runtime
    /// or the tokenizer reject the files.
    pub fn load(dir: &Path, model_name: &str, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(EmbedError::ZeroDimension.into());
        }
        let files = ModelFiles::locate(dir)?;

        #[cfg(feature = "semantic-ort")]
        {
            let session = Session::builder()
                .context("failed to create ONNX Runtime session builder")?
                .commit_from_file(&files.model)
                .with_context(|| format!("failed to load ONNX model {}", files.model.display()))?;

            let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
                .map_err(|e| anyhow!("failed to load tokenizer: {e}"))?;
            tokenizer
                .with_truncation(Some(tokenizers::TruncationParams {
                    max_length: MAX_TOKENS,
                    ..Default::default()
                }))
                .map_err(|e| anyhow!("failed to configure truncation: {e}"))?;

            tracing::info!(model = %files.model.display(), dimension, "loaded ONNX embedder");
            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
                model_name: model_name.to_owned(),
                dimension,
            })
        }

        #[cfg(not(feature = "semantic-ort"))]
        {
            let _ = (files, model_name);
            Err(EmbedError::ModelUnavailable(
                "ONNX runtime not compiled in; rebuild duet-search with `semantic-ort`".into(),
            )
            .into())
        }
    }

    #[cfg(feature = "semantic-ort")]
    fn infer(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;
        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&x| i64::from(x)).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&x| i64::from(x))
            .collect();
        let seq_len = input_ids.len();

        let ids = Array2::from_shape_vec((1, seq_len), input_ids)
            .context("failed to shape input_ids")?;
        let mask = Array2::from_shape_vec((1, seq_len), attention_mask.clone())
            .context("failed to shape attention_mask")?;
        let type_ids = Array2::from_shape_vec((1, seq_len), vec![0_i64; seq_len])
            .context("failed to shape token_type_ids")?;

        let token_embeddings = {
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            let outputs = session
                .run(inputs![
                    "input_ids" => Value::from_array(ids)?,
                    "attention_mask" => Value::from_array(mask)?,
                    "token_type_ids" => Value::from_array(type_ids)?
                ])
                .context("ONNX inference failed")?;

            let (shape, data) = outputs["last_hidden_state"]
                .try_extract_tensor::<f32>()
                .context("failed to extract last_hidden_state")?;
            let dims = shape.as_ref();
            if dims.len() != 3 {
                bail!("expected a 3-d last_hidden_state, got shape {dims:?}");
            }
            let rows = usize::try_from(dims[1]).context("negative sequence length")?;
            let hidden = usize::try_from(dims[2]).context("negative hidden size")?;
            if hidden != self.dimension {
                return Err(EmbedError::OutputDimension {
                    expected: self.dimension,
                    actual: hidden,
                }
                .into());
            }
            Array2::from_shape_vec((rows, hidden), data[..rows * hidden].to_vec())
                .context("failed to reshape token embeddings")?
        };

        Ok(l2_normalize(&mean_pool(&token_embeddings, &attention_mask)))
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[cfg(feature = "semantic-ort")]
        {
            let vector = self.infer(text)?;
            check_vector(self.dimension, &vector)?;
            Ok(vector)
        }

        #[cfg(not(feature = "semantic-ort"))]
        {
            let _ = (text, check_vector);
            Err(EmbedError::ModelUnavailable("ONNX runtime not compiled in".into()).into())
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Whether this build can run the ONNX backend at all.
#[must_use]
pub const fn is_onnx_available() -> bool {
    cfg!(feature = "semantic-ort")
}

/// Average of token vectors where the attention mask is set.
#[cfg(feature = "semantic-ort")]
fn mean_pool(token_embeddings: &Array2<f32>, attention_mask: &[i64]) -> Vec<f32> {
    let hidden = token_embeddings.ncols();
    let mut pooled = vec![0.0_f32; hidden];
    let mut count = 0.0_f32;
    for (row, &mask) in token_embeddings.rows().into_iter().zip(attention_mask) {
        if mask == 0 {
            continue;
        }
        count += 1.0;
        for (acc, value) in pooled.iter_mut().zip(row.iter()) {
            *acc += value;
        }
    }
    if count > 0.0 {
        for value in &mut pooled {
            *value /= count;
        }
    }
    pooled
}

#[cfg(feature = "semantic-ort")]
fn l2_normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / norm).collect()
}
