use std::fmt;

/// Errors raised by the document store that callers may want to branch on.
///
/// These are returned wrapped in `anyhow::Error`; use
/// `err.downcast_ref::<StoreError>()` to recover them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A vector's length differs from the dimension fixed at store creation.
    #[error("embedding dimension mismatch: store expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A store cannot be created with a zero-length vector column.
    #[error("vector dimension must be positive")]
    InvalidDimension,

    /// The metadata row recording the vector dimension is missing.
    #[error("document store schema is missing; run `duet init`")]
    SchemaMissing,
}

impl StoreError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            Self::InvalidDimension => ErrorCode::InvalidInput,
            Self::SchemaMissing => ErrorCode::NotInitialized,
        }
    }
}

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    ModelNotFound,
    InvalidInput,
    EmptyQuery,
    DimensionMismatch,
    CorruptStore,
    StoreWriteFailed,
    EmbeddingFailed,
    SemanticModelLoadFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ModelNotFound => "E1003",
            Self::InvalidInput => "E2001",
            Self::EmptyQuery => "E2002",
            Self::DimensionMismatch => "E3001",
            Self::CorruptStore => "E3002",
            Self::StoreWriteFailed => "E5001",
            Self::EmbeddingFailed => "E6001",
            Self::SemanticModelLoadFailed => "E6002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Document store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::ModelNotFound => "Embedding model not found",
            Self::InvalidInput => "Invalid input",
            Self::EmptyQuery => "Empty query",
            Self::DimensionMismatch => "Embedding dimension mismatch",
            Self::CorruptStore => "Corrupt document store",
            Self::StoreWriteFailed => "Document store write failed",
            Self::EmbeddingFailed => "Embedding failed",
            Self::SemanticModelLoadFailed => "Embedding model load failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `duet init` to create the document store."),
            Self::ConfigParseError => Some("Fix syntax in .duet/config.toml and retry."),
            Self::ModelNotFound => {
                Some("Place model.onnx and tokenizer.json in embedding.model_dir.")
            }
            Self::InvalidInput => None,
            Self::EmptyQuery => Some("Provide a non-empty query string."),
            Self::DimensionMismatch => Some(
                "The store's vector dimension is fixed at creation; use a new store for a different model.",
            ),
            Self::CorruptStore => Some("Move the database aside and re-run `duet init`."),
            Self::StoreWriteFailed => Some("Check disk space and write permissions."),
            Self::EmbeddingFailed => Some("Check the input text and the embedding backend logs."),
            Self::SemanticModelLoadFailed => {
                Some("Verify model files and ONNX Runtime are available.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
