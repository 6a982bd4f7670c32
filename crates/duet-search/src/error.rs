use duet_core::error::ErrorCode;

/// Embedding failures callers may want to branch on.
///
/// Returned inside `anyhow::Error`; recover with `downcast_ref::<EmbedError>()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmbedError {
    /// The backend returned a different number of vectors than texts given.
    #[error("embedder returned {actual} vectors for {expected} texts")]
    BatchLengthMismatch { expected: usize, actual: usize },

    /// The backend produced a vector of the wrong length.
    #[error("embedder produced a {actual}-dimensional vector, expected {expected}")]
    OutputDimension { expected: usize, actual: usize },

    #[error("embedding dimension must be positive")]
    ZeroDimension,

    /// The configured model cannot be loaded.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),
}

impl EmbedError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::BatchLengthMismatch { .. } | Self::OutputDimension { .. } => {
                ErrorCode::EmbeddingFailed
            }
            Self::ZeroDimension => ErrorCode::InvalidInput,
            Self::ModelUnavailable(_) => ErrorCode::SemanticModelLoadFailed,
        }
    }
}
