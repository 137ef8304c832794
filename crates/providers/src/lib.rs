//! Embedding provider abstractions.
//!
//! The classification engine only ever sees text going in and dense vectors
//! coming out; everything model specific lives behind [`EmbeddingProvider`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod hashing;
pub mod openai;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("not implemented")]
    NotImplemented,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub vectors: Vec<Vec<f32>>,
}

/// Maps a batch of texts to one vector per text, in input order.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError>;

    /// Stable identifier of the underlying model, used to tell apart
    /// prototypes computed by different models.
    fn model_id(&self) -> String;
}

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    embeddings: HashMap<String, Arc<dyn EmbeddingProvider>>,
    pub preferred_embedding: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding(mut self, name: &str, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embeddings.insert(name.to_string(), provider);
        self
    }

    pub fn set_preferred_embedding(mut self, name: &str) -> Self {
        self.preferred_embedding = Some(name.to_string());
        self
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.embeddings.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn embedding(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.preferred_embedding.clone())
            .ok_or_else(|| {
                ProviderError::UnknownProvider("no embedding provider configured".into())
            })?;
        self.embeddings
            .get(&key)
            .cloned()
            .ok_or(ProviderError::UnknownProvider(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingProvider;

    #[test]
    fn registry_resolves_preferred_provider() {
        let reg = ProviderRegistry::new()
            .with_embedding("hashing", Arc::new(HashingProvider::new(32)))
            .set_preferred_embedding("hashing");
        let provider = reg.embedding(None).unwrap();
        assert_eq!(provider.model_id(), "hashing-32");
        assert_eq!(reg.names(), vec!["hashing".to_string()]);
    }

    #[test]
    fn registry_rejects_unknown_provider() {
        let reg = ProviderRegistry::new().set_preferred_embedding("openai");
        match reg.embedding(None) {
            Err(ProviderError::UnknownProvider(name)) => assert_eq!(name, "openai"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
        assert!(ProviderRegistry::new().embedding(None).is_err());
    }
}
