//! Category prototypes, embedded once at startup and read-only afterwards.

use crate::config::CategorySpec;
use crate::embeddings::Embedder;
use crate::error::{EmbeddingError, RegistryError};
use crate::models::Category;
use crate::text;
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
    fallback: usize,
    dimension: usize,
    model_id: String,
}

impl CategoryRegistry {
    /// Embeds each description (one call per category) in declaration order.
    /// Any failure aborts initialization.
    pub async fn initialize(
        specs: &[CategorySpec],
        fallback: &str,
        embedder: &Embedder,
        preprocess: bool,
    ) -> Result<Self, RegistryError> {
        validate(specs.iter().map(|s| s.name.as_str()), fallback)?;

        let mut categories = Vec::with_capacity(specs.len());
        for spec in specs {
            let input = if preprocess {
                text::preprocess(&spec.description)
            } else {
                spec.description.clone()
            };
            let prototype = embedder
                .embed(&input)
                .await
                .map_err(|source| RegistryError::Embedding {
                    category: spec.name.clone(),
                    source,
                })?;
            categories.push(Category {
                name: spec.name.clone(),
                description: spec.description.clone(),
                prototype_embedding: prototype,
            });
        }

        let registry = Self::from_categories(categories, fallback, embedder.model_id())?;
        for category in &registry.categories {
            info!(category = %category.name, dim = registry.dimension, "registered category");
        }
        Ok(registry)
    }

    /// Builds a registry from prototypes that were computed elsewhere.
    pub fn from_categories(
        categories: Vec<Category>,
        fallback: &str,
        model_id: String,
    ) -> Result<Self, RegistryError> {
        validate(categories.iter().map(|c| c.name.as_str()), fallback)?;

        let dimension = categories[0].prototype_embedding.len();
        for category in &categories {
            let actual = category.prototype_embedding.len();
            if actual == 0 || actual != dimension {
                let source = if actual == 0 {
                    EmbeddingError::EmptyVector
                } else {
                    EmbeddingError::DimensionMismatch {
                        expected: dimension,
                        actual,
                    }
                };
                return Err(RegistryError::Embedding {
                    category: category.name.clone(),
                    source,
                });
            }
        }

        let fallback = categories
            .iter()
            .position(|c| c.name == fallback)
            .ok_or_else(|| RegistryError::MissingFallback(fallback.to_string()))?;
        Ok(Self {
            categories,
            fallback,
            dimension,
            model_id,
        })
    }

    pub fn prototype_of(&self, name: &str) -> Option<&[f32]> {
        self.categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.prototype_embedding.as_slice())
    }

    /// Categories in declaration order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn fallback(&self) -> &Category {
        &self.categories[self.fallback]
    }

    pub fn fallback_index(&self) -> usize {
        self.fallback
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn validate<'a>(names: impl Iterator<Item = &'a str>, fallback: &str) -> Result<(), RegistryError> {
    let mut seen = HashSet::new();
    let mut has_fallback = false;
    for name in names {
        if !seen.insert(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        has_fallback |= name == fallback;
    }
    if seen.is_empty() {
        return Err(RegistryError::Empty);
    }
    if !has_fallback {
        return Err(RegistryError::MissingFallback(fallback.to_string()));
    }
    Ok(())
}
