//! Zero-shot classification by cosine similarity to category prototypes.

use crate::chunker::{length_weights, Chunker};
use crate::config::{AppConfig, DegeneratePolicy};
use crate::embeddings::Embedder;
use crate::error::EmbeddingError;
use crate::models::{CategoryScore, Chunk, ClassificationResult};
use crate::registry::CategoryRegistry;
use crate::text;
use std::sync::Arc;
use tracing::{debug, warn};

/// Shifted scores summing to less than this are treated as no signal.
const DEGENERATE_EPSILON: f64 = 1e-12;

/// Scores `chunks` against every category in `registry`.
///
/// Per category: length-weighted mean cosine similarity over chunks, shifted
/// from `[-1, 1]` into `[0, 1]` and normalized so the distribution sums to 1.
/// Input with no text, or whose chunks all embed to zero vectors, falls back
/// to `policy`.
pub fn classify(
    chunks: &[Chunk],
    registry: &CategoryRegistry,
    policy: DegeneratePolicy,
) -> Result<ClassificationResult, EmbeddingError> {
    let dimension = registry.dimension();
    for chunk in chunks {
        if chunk.embedding.len() != dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: chunk.embedding.len(),
            });
        }
    }

    let total_weight: f64 = chunks.iter().map(|c| c.weight).sum();
    // A zero embedding is similar to nothing, so a chunk needs both text and
    // a non-zero vector to count as signal.
    let has_signal = chunks
        .iter()
        .any(|c| !c.text.trim().is_empty() && c.embedding.iter().any(|x| *x != 0.0));
    if !has_signal || total_weight <= 0.0 {
        return Ok(degenerate(registry, policy));
    }

    let shifted: Vec<f64> = registry
        .categories()
        .iter()
        .map(|category| {
            let weighted: f64 = chunks
                .iter()
                .map(|c| c.weight * cosine(&c.embedding, &category.prototype_embedding))
                .sum();
            (weighted / total_weight + 1.0) / 2.0
        })
        .collect();

    let total: f64 = shifted.iter().sum();
    if !total.is_finite() || total < DEGENERATE_EPSILON {
        return Ok(degenerate(registry, policy));
    }

    let scores = registry
        .categories()
        .iter()
        .zip(shifted)
        .map(|(category, s)| CategoryScore {
            category: category.name.clone(),
            confidence: s / total,
        })
        .collect();
    Ok(ClassificationResult {
        scores,
        degenerate: false,
    })
}

/// Distribution used when a document carries no usable text.
pub fn degenerate(registry: &CategoryRegistry, policy: DegeneratePolicy) -> ClassificationResult {
    let n = registry.len() as f64;
    let fallback = registry.fallback_index();
    let scores = registry
        .categories()
        .iter()
        .enumerate()
        .map(|(i, category)| CategoryScore {
            category: category.name.clone(),
            confidence: match policy {
                DegeneratePolicy::Uniform => 1.0 / n,
                DegeneratePolicy::Other if i == fallback => 1.0,
                DegeneratePolicy::Other => 0.0,
            },
        })
        .collect();
    ClassificationResult {
        scores,
        degenerate: true,
    }
}

/// Zero-norm vectors have similarity 0 with everything.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

/// Text in, distribution out: chunk, embed, classify.
#[derive(Debug, Clone)]
pub struct TextClassifier {
    registry: Arc<CategoryRegistry>,
    embedder: Embedder,
    chunker: Chunker,
    max_chunks: usize,
    preprocess: bool,
    policy: DegeneratePolicy,
}

impl TextClassifier {
    pub fn new(registry: Arc<CategoryRegistry>, embedder: Embedder, config: &AppConfig) -> Self {
        Self {
            registry,
            embedder,
            chunker: Chunker::new(config.chunking),
            max_chunks: config.chunking.max_chunks,
            preprocess: config.classification.preprocess,
            policy: config.classification.degenerate_policy,
        }
    }

    pub fn registry(&self) -> &CategoryRegistry {
        &self.registry
    }

    pub async fn classify_text(&self, text: &str) -> Result<ClassificationResult, EmbeddingError> {
        let mut pieces = self.chunker.chunk(text);
        if self.max_chunks > 0 && pieces.len() > self.max_chunks {
            debug!(total = pieces.len(), kept = self.max_chunks, "truncating chunks");
            pieces.truncate(self.max_chunks);
        }
        let texts: Vec<String> = pieces.into_iter().map(|p| p.text).collect();
        if texts.iter().all(|t| t.is_empty()) {
            warn!("no text to classify, applying degenerate policy");
            return Ok(degenerate(&self.registry, self.policy));
        }

        let inputs: Vec<String> = if self.preprocess {
            texts.iter().map(|t| text::preprocess(t)).collect()
        } else {
            texts.clone()
        };
        let embeddings = self.embedder.embed_batch(&inputs).await?;
        let weights = length_weights(&texts);
        let chunks: Vec<Chunk> = texts
            .into_iter()
            .zip(embeddings)
            .zip(weights)
            .map(|((text, embedding), weight)| Chunk {
                text,
                embedding,
                weight,
            })
            .collect();

        let result = classify(&chunks, &self.registry, self.policy)?;
        if result.degenerate {
            warn!(chunks = chunks.len(), "chunks carried no signal, applying degenerate policy");
        }
        debug!(
            chunks = chunks.len(),
            top = result.top_category().unwrap_or_default(),
            "classified text"
        );
        Ok(result)
    }
}
