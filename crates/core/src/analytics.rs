//! Corpus statistics over stored classification results.
//!
//! Read-only aggregation over a snapshot of documents. Documents without a
//! usable classification are counted in `skipped_records` and left out of
//! every other figure.

use crate::config::AnalyticsConfig;
use crate::models::Document;
use crate::pca;
use crate::wordcloud::{self, WordCloud};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub count: usize,
    /// Mean of members' confidence in this category.
    pub average_confidence: f64,
    pub average_size: f64,
    /// Mean extracted text length in characters.
    pub average_length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcaPoint {
    pub document_id: i64,
    pub filename: String,
    pub top_category: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcaProjection {
    pub points: Vec<PcaPoint>,
    pub explained_variance: [f64; 2],
    /// Loadings of each component over the categories, in registry order.
    pub components: [Vec<f64>; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAccuracy {
    pub category: String,
    pub correct: usize,
    /// Labeled documents predicted as this category.
    pub total: usize,
    pub precision: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyReport {
    pub evaluated: usize,
    pub correct: usize,
    pub overall: f64,
    /// Classified documents with no reference label.
    pub unlabeled: usize,
    pub per_category: Vec<CategoryAccuracy>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub total_documents: usize,
    pub skipped_records: usize,
    pub categories: Vec<CategoryStats>,
    pub pca: PcaProjection,
    pub accuracy: Option<AccuracyReport>,
    pub word_clouds: Vec<WordCloud>,
}

impl AnalyticsReport {
    pub fn category(&self, name: &str) -> Option<&CategoryStats> {
        self.categories.iter().find(|c| c.category == name)
    }
}

/// Reference labels keyed by lower-cased filename stem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundTruth {
    labels: HashMap<String, String>,
}

#[derive(Deserialize)]
struct LabelsFile {
    #[serde(default)]
    labels: HashMap<String, String>,
}

impl GroundTruth {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            labels: pairs
                .into_iter()
                .map(|(k, v)| (label_key(k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// Parses a `[labels]` table of `filename = "Category"`.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let file: LabelsFile = toml::from_str(s).context("parse labels")?;
        Ok(Self::from_pairs(file.labels))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read labels {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn label_for(&self, filename: &str) -> Option<&str> {
        self.labels.get(&label_key(filename)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// File name without directories or extension, lower-cased.
fn label_key(filename: &str) -> String {
    let name = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    name.to_lowercase()
}

fn mean(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

pub fn compute_statistics(
    documents: &[Document],
    categories: &[String],
    ground_truth: Option<&GroundTruth>,
    cfg: &AnalyticsConfig,
) -> AnalyticsReport {
    let column: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    // (document, top category column, top confidence)
    let mut valid: Vec<(&Document, usize, f64)> = Vec::with_capacity(documents.len());
    let mut skipped = 0usize;
    for doc in documents {
        let top = doc
            .classification
            .as_ref()
            .filter(|c| c.scores.iter().all(|s| s.confidence.is_finite()))
            .and_then(|c| c.top())
            .and_then(|t| column.get(t.category.as_str()).map(|&i| (i, t.confidence)));
        match top {
            Some((i, confidence)) => valid.push((doc, i, confidence)),
            None => {
                debug!(document_id = doc.id, filename = %doc.filename, "skipping unclassified document");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "documents without a usable classification left out of analytics");
    }

    let mut sums = vec![(0usize, 0.0f64, 0.0f64, 0.0f64); categories.len()];
    for (doc, i, confidence) in &valid {
        let entry = &mut sums[*i];
        entry.0 += 1;
        entry.1 += confidence;
        entry.2 += doc.size as f64;
        entry.3 += doc.extracted_text.chars().count() as f64;
    }
    let stats = categories
        .iter()
        .zip(&sums)
        .map(|(name, &(count, conf, size, len))| CategoryStats {
            category: name.clone(),
            count,
            average_confidence: mean(conf, count),
            average_size: mean(size, count),
            average_length: mean(len, count),
        })
        .collect();

    let rows: Vec<Vec<f64>> = valid
        .iter()
        .map(|(doc, _, _)| {
            let cls = doc.classification.as_ref();
            categories
                .iter()
                .map(|c| cls.and_then(|r| r.get(c)).unwrap_or(0.0))
                .collect()
        })
        .collect();
    let projection = pca::project(&rows);
    let pca = PcaProjection {
        points: valid
            .iter()
            .zip(&projection.points)
            .map(|((doc, i, _), [x, y])| PcaPoint {
                document_id: doc.id,
                filename: doc.filename.clone(),
                top_category: categories[*i].clone(),
                x: *x,
                y: *y,
            })
            .collect(),
        explained_variance: projection.explained_variance,
        components: projection.components,
    };

    let accuracy = ground_truth.map(|gt| accuracy_report(&valid, categories, gt));

    let word_clouds = categories
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let texts = valid
                .iter()
                .filter(|(_, col, _)| *col == i)
                .map(|(doc, _, _)| doc.extracted_text.as_str());
            wordcloud::build(name, texts, cfg.top_words, cfg.min_token_len)
        })
        .collect();

    AnalyticsReport {
        total_documents: documents.len(),
        skipped_records: skipped,
        categories: stats,
        pca,
        accuracy,
        word_clouds,
    }
}

fn accuracy_report(
    valid: &[(&Document, usize, f64)],
    categories: &[String],
    gt: &GroundTruth,
) -> AccuracyReport {
    let mut per = vec![(0usize, 0usize); categories.len()];
    let mut unlabeled = 0usize;
    for (doc, predicted, _) in valid {
        let Some(expected) = gt.label_for(&doc.filename) else {
            unlabeled += 1;
            continue;
        };
        let entry = &mut per[*predicted];
        entry.1 += 1;
        if expected.eq_ignore_ascii_case(&categories[*predicted]) {
            entry.0 += 1;
        }
    }
    let evaluated: usize = per.iter().map(|p| p.1).sum();
    let correct: usize = per.iter().map(|p| p.0).sum();
    AccuracyReport {
        evaluated,
        correct,
        overall: mean(correct as f64, evaluated),
        unlabeled,
        per_category: categories
            .iter()
            .zip(per)
            .map(|(name, (correct, total))| CategoryAccuracy {
                category: name.clone(),
                correct,
                total,
                precision: mean(correct as f64, total),
            })
            .collect(),
    }
}
