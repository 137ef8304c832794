//! The engine wiring extraction, duplicate detection, classification,
//! persistence and analytics together.

use crate::analytics::{self, AnalyticsReport, GroundTruth};
use crate::classifier::TextClassifier;
use crate::config::AppConfig;
use crate::duplicates::{self, DuplicateIndex};
use crate::embeddings::Embedder;
use crate::error::{EmbeddingError, IngestError};
use crate::extractor;
use crate::models::{ClassificationResult, Document, DuplicateOutcome, NewDocument};
use crate::registry::CategoryRegistry;
use crate::store::{DocumentStore, InsertOutcome, ListFilter, SqliteDocumentStore};
use anyhow::Context;
use chrono::Utc;
use providers::hashing::HashingProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use serde::Serialize;
use std::sync::Arc;
use storage::{connect, migrate};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Created { document: Document },
    Duplicate {
        existing_id: i64,
        existing_filename: String,
        content_hash: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReclassifySummary {
    pub updated: usize,
    /// Documents with no text, or deleted while the batch ran.
    pub skipped: usize,
    pub failed: usize,
}

/// Returned immediately by [`Engine::reclassify_all`]; the work continues in
/// the background whether or not the handle is awaited.
pub struct ReclassifyHandle {
    pub queued: usize,
    join: JoinHandle<ReclassifySummary>,
}

impl ReclassifyHandle {
    pub async fn wait(self) -> anyhow::Result<ReclassifySummary> {
        self.join.await.context("reclassification task panicked")
    }
}

pub struct Engine {
    config: AppConfig,
    classifier: TextClassifier,
    store: Arc<dyn DocumentStore>,
    index: Mutex<DuplicateIndex>,
}

impl Engine {
    /// Builds the registry (embedding every category description) and loads
    /// the duplicate index from the store.
    pub async fn new(
        config: AppConfig,
        embedder: Embedder,
        store: Arc<dyn DocumentStore>,
    ) -> anyhow::Result<Self> {
        let registry = CategoryRegistry::initialize(
            &config.classification.categories,
            &config.classification.fallback_category,
            &embedder,
            config.classification.preprocess,
        )
        .await
        .context("initialize category registry")?;
        info!(
            categories = registry.len(),
            dim = registry.dimension(),
            model = registry.model_id(),
            "category registry ready"
        );

        let index = DuplicateIndex::from_entries(store.all_hashes().await.context("load content hashes")?);
        debug!(documents = index.len(), "duplicate index loaded");

        let classifier = TextClassifier::new(Arc::new(registry), embedder, &config);
        Ok(Self {
            config,
            classifier,
            store,
            index: Mutex::new(index),
        })
    }

    /// Provider registry, embedder and SQLite store from configuration.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let providers = build_registry(&config);
        let embedder = Embedder::from_registry(&providers, None, config.embeddings.batch_size)
            .with_context(|| format!("embedding provider {:?}", config.embeddings.provider))?;
        let pool = connect(&config.database.path).await.context("db connect")?;
        migrate(&pool).await.context("db migrate")?;
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(pool));
        Self::new(config, embedder, store).await
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &CategoryRegistry {
        self.classifier.registry()
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub async fn classify(&self, text: &str) -> Result<ClassificationResult, EmbeddingError> {
        self.classifier.classify_text(text).await
    }

    pub async fn check_duplicate(&self, text: &str) -> DuplicateOutcome {
        duplicates::check_duplicate(text, &*self.index.lock().await)
    }

    /// Extract, check for a duplicate, classify, persist. Nothing is stored
    /// when extraction or embedding fails.
    pub async fn ingest(&self, upload: Upload) -> Result<IngestOutcome, IngestError> {
        let Upload {
            filename,
            content_type,
            bytes,
        } = upload;
        let text = extractor::extract(
            &bytes,
            &content_type,
            &filename,
            self.config.ingestion.max_upload_bytes,
        )
        .map_err(|e| {
            warn!(filename = %filename, error = %e, "extraction failed");
            e
        })?;
        let content_hash = duplicates::content_hash(&text);

        if let DuplicateOutcome::Duplicate {
            existing_id,
            existing_filename,
        } = self.index.lock().await.check_hash(&content_hash)
        {
            info!(filename = %filename, existing_id, existing = %existing_filename, "duplicate upload");
            return Ok(IngestOutcome::Duplicate {
                existing_id,
                existing_filename,
                content_hash,
            });
        }

        let classification = self.classifier.classify_text(&text).await.map_err(|e| {
            error!(filename = %filename, error = %e, "classification failed");
            e
        })?;

        let new_doc = NewDocument {
            filename: filename.clone(),
            content_type: content_type.clone(),
            size: bytes.len() as u64,
            content_hash: content_hash.clone(),
            extracted_text: text,
            classification,
            uploaded_at: Utc::now(),
        };

        let mut index = self.index.lock().await;
        match self
            .store
            .insert_unique(new_doc)
            .await
            .map_err(IngestError::Storage)?
        {
            InsertOutcome::Inserted(document) => {
                index.insert(content_hash, document.id, document.filename.clone());
                info!(
                    document_id = document.id,
                    filename = %document.filename,
                    category = document.top_category().unwrap_or_default(),
                    degenerate = document.classification.as_ref().is_some_and(|c| c.degenerate),
                    "document classified"
                );
                Ok(IngestOutcome::Created { document })
            }
            InsertOutcome::Existing { id, filename: existing_filename } => {
                index.insert(content_hash.clone(), id, existing_filename.clone());
                info!(filename = %filename, existing_id = id, existing = %existing_filename, "duplicate upload");
                Ok(IngestOutcome::Duplicate {
                    existing_id: id,
                    existing_filename,
                    content_hash,
                })
            }
        }
    }

    pub async fn fetch(&self, id: i64) -> anyhow::Result<Option<Document>> {
        self.store.fetch(id).await
    }

    pub async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Document>> {
        self.store.list(filter).await
    }

    pub async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let mut index = self.index.lock().await;
        let removed = self.store.delete(id).await?;
        if removed {
            index.remove_id(id);
            info!(document_id = id, "document deleted");
        }
        Ok(removed)
    }

    pub fn compute_statistics(
        &self,
        documents: &[Document],
        ground_truth: Option<&GroundTruth>,
    ) -> AnalyticsReport {
        analytics::compute_statistics(
            documents,
            &self.registry().names(),
            ground_truth,
            &self.config.analytics,
        )
    }

    /// Statistics over every stored document.
    pub async fn statistics(&self, ground_truth: Option<&GroundTruth>) -> anyhow::Result<AnalyticsReport> {
        let documents = self.store.list(&ListFilter::default()).await?;
        Ok(self.compute_statistics(&documents, ground_truth))
    }

    /// Queues every document with text for reclassification on a background
    /// task and returns at once. A failure on one document is logged and
    /// counted; the rest of the batch still runs.
    pub fn reclassify_all(&self, documents: Vec<Document>) -> ReclassifyHandle {
        let (queue, empty): (Vec<Document>, Vec<Document>) = documents
            .into_iter()
            .partition(|d| !d.extracted_text.trim().is_empty());
        let queued = queue.len();
        let classifier = self.classifier.clone();
        let store = self.store.clone();
        info!(queued, skipped = empty.len(), "reclassification queued");

        let join = tokio::spawn(async move {
            let mut summary = ReclassifySummary {
                skipped: empty.len(),
                ..Default::default()
            };
            for doc in queue {
                let result = match classifier.classify_text(&doc.extracted_text).await {
                    Ok(r) => r,
                    Err(e) => {
                        error!(document_id = doc.id, error = %e, "reclassification failed");
                        summary.failed += 1;
                        continue;
                    }
                };
                match store.update_classification(doc.id, &result).await {
                    Ok(true) => {
                        debug!(
                            document_id = doc.id,
                            category = result.top_category().unwrap_or_default(),
                            "reclassified"
                        );
                        summary.updated += 1;
                    }
                    Ok(false) => summary.skipped += 1,
                    Err(e) => {
                        error!(document_id = doc.id, error = %e, "failed to store classification");
                        summary.failed += 1;
                    }
                }
            }
            info!(
                updated = summary.updated,
                skipped = summary.skipped,
                failed = summary.failed,
                "reclassification finished"
            );
            summary
        });
        ReclassifyHandle { queued, join }
    }
}

/// The hashing provider is always available. The OpenAI-compatible provider
/// is registered when `OPENAI_API_KEY` is set.
pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new().with_embedding(
        "hashing",
        Arc::new(HashingProvider::new(config.embeddings.dimensions)),
    );

    if let Some(key) = std::env::var_os("OPENAI_API_KEY") {
        let base = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com".to_string());
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url: base,
            embedding_model: config.embeddings.model.clone(),
        });
        reg = reg.with_embedding("openai", Arc::new(provider));
    }

    reg.set_preferred_embedding(&config.embeddings.provider)
}
