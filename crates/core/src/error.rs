use thiserror::Error;

/// The uploaded bytes could not be turned into text. Surfaced to callers as a
/// validation failure; retrying the same bytes will not help.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("file is {actual} bytes, the limit is {limit}")]
    TooLarge { actual: usize, limit: usize },
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),
    #[error("file extension .{extension} does not match content type {content_type}")]
    ExtensionMismatch {
        extension: String,
        content_type: String,
    },
    #[error("text file is not valid UTF-8")]
    Encoding,
    #[error("document is encrypted")]
    Encrypted,
    #[error("document is corrupt: {0}")]
    Corrupt(String),
    #[error("document contains no extractable text")]
    NoText,
    #[error("{0} support is not compiled in")]
    FeatureDisabled(&'static str),
}

/// The embedding model failed or produced vectors the engine cannot use.
/// Fatal for the request that hit it.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider failed: {0}")]
    Provider(#[from] providers::ProviderError),
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("embedding provider returned an empty vector")]
    EmptyVector,
    #[error("embedding provider returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no categories configured")]
    Empty,
    #[error("category declared twice: {0}")]
    DuplicateName(String),
    #[error("fallback category {0:?} is not registered")]
    MissingFallback(String),
    #[error("failed to embed description of {category:?}: {source}")]
    Embedding {
        category: String,
        #[source]
        source: EmbeddingError,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl IngestError {
    /// Whether the failure is the uploader's fault rather than ours.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, IngestError::Extraction(_))
    }
}
