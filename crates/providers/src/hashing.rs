//! Offline provider: signed feature hashing over lower-cased word tokens.
//!
//! Not a semantic model, but texts sharing vocabulary land close together,
//! which is enough to run the whole pipeline without network access.

use crate::{EmbedResponse, EmbeddingProvider, ProviderError};

#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimensions: usize,
}

impl HashingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = blake3::hash(word.as_bytes());
            let bytes = hash.as_bytes();
            let mut idx = [0u8; 8];
            idx.copy_from_slice(&bytes[..8]);
            let pos = (u64::from_le_bytes(idx) % self.dimensions as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[pos] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashingProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        Ok(EmbedResponse {
            vectors: texts.iter().map(|t| self.embed_one(t)).collect(),
        })
    }

    fn model_id(&self) -> String {
        format!("hashing-{}", self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn identical_text_identical_vector() {
        let p = HashingProvider::new(64);
        assert_eq!(p.embed_one("Legal contracts"), p.embed_one("legal   CONTRACTS"));
    }

    #[test]
    fn vectors_are_unit_length() {
        let p = HashingProvider::new(64);
        let v = p.embed_one("quarterly finance report for the board");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let p = HashingProvider::new(16);
        let v = p.embed_one("   ");
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let p = HashingProvider::new(256);
        let q = p.embed_one("legal contracts and binding agreements");
        let near = p.embed_one("contracts are legal agreements");
        let far = p.embed_one("quarterly finance reports");
        assert!(cosine(&q, &near) > cosine(&q, &far));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let p = HashingProvider::new(32);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let resp = p.embed(&texts).await.unwrap();
        assert_eq!(resp.vectors.len(), 2);
        assert_eq!(resp.vectors[0], p.embed_one("alpha"));
        assert_eq!(resp.vectors[1], p.embed_one("beta"));
    }
}
