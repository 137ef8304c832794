use crate::error::EmbeddingError;
use providers::{EmbeddingProvider, ProviderError, ProviderRegistry};
use std::sync::Arc;
use tracing::{debug, error};

/// Thin adapter over an [`EmbeddingProvider`]: batches requests and rejects
/// responses the classifier cannot use (wrong count, empty or ragged vectors).
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("model", &self.provider.model_id())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Resolves `name` (or the preferred provider) from the registry.
    pub fn from_registry(
        registry: &ProviderRegistry,
        name: Option<&str>,
        batch_size: usize,
    ) -> Result<Self, ProviderError> {
        Ok(Self::new(registry.embedding(name)?, batch_size))
    }

    pub fn model_id(&self) -> String {
        self.provider.model_id()
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })
    }

    /// One vector per input, in input order, all of the same width.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let resp = self.provider.embed(batch).await.map_err(|e| {
                error!(model = %self.provider.model_id(), error = %e, "embedding request failed");
                EmbeddingError::from(e)
            })?;
            if resp.vectors.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: resp.vectors.len(),
                });
            }
            vectors.extend(resp.vectors);
        }

        let width = match vectors.first() {
            Some(v) => v.len(),
            None => return Ok(vectors),
        };
        if width == 0 {
            return Err(EmbeddingError::EmptyVector);
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != width) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: width,
                actual: bad.len(),
            });
        }
        debug!(count = vectors.len(), dim = width, "embedded batch");
        Ok(vectors)
    }
}
