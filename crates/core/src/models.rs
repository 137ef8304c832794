use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A category with its prototype embedding, computed once from `description`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: String,
    pub prototype_embedding: Vec<f32>,
}

/// A chunk ready for scoring. `weight` is the chunk's share of the total
/// character length of all scored chunks.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub embedding: Vec<f32>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub confidence: f64,
}

/// Confidence distribution over every registered category, in registry
/// declaration order. Confidences are non-negative and sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub scores: Vec<CategoryScore>,
    /// Set when the input carried no usable text and the distribution came
    /// from the degenerate-input policy instead of similarity.
    #[serde(default)]
    pub degenerate: bool,
}

impl ClassificationResult {
    pub fn get(&self, category: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.category == category)
            .map(|s| s.confidence)
    }

    /// Argmax; on ties the first-declared category wins.
    pub fn top(&self) -> Option<&CategoryScore> {
        let mut best: Option<&CategoryScore> = None;
        for score in &self.scores {
            match best {
                Some(b) if score.confidence <= b.confidence => {}
                _ => best = Some(score),
            }
        }
        best
    }

    pub fn top_category(&self) -> Option<&str> {
        self.top().map(|s| s.category.as_str())
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().map(|s| s.confidence).sum()
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|s| (s.category.clone(), s.confidence))
            .collect()
    }

    /// Categories sorted by confidence, highest first, ties in declaration order.
    pub fn ranked(&self) -> Vec<&CategoryScore> {
        let mut ranked: Vec<&CategoryScore> = self.scores.iter().collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        ranked
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub content_hash: String,
    pub extracted_text: String,
    /// `None` when the stored classification is missing or unreadable.
    pub classification: Option<ClassificationResult>,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn top_category(&self) -> Option<&str> {
        self.classification.as_ref().and_then(|c| c.top_category())
    }
}

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub content_hash: String,
    pub extracted_text: String,
    pub classification: ClassificationResult,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DuplicateOutcome {
    Unique,
    Duplicate {
        existing_id: i64,
        existing_filename: String,
    },
}
