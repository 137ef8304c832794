//! Persistence seam for document records.

use crate::models::{ClassificationResult, Document, NewDocument};
use chrono::{DateTime, TimeZone, Utc};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use storage::documents;
use storage::models::{DocumentRow, ListQuery, NewDocumentRow};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted(Document),
    /// The content hash already belongs to this document.
    Existing { id: i64, filename: String },
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Matches the stored top category.
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Insert-unique must be atomic: of two concurrent inserts with the same
/// content hash exactly one returns `Inserted`.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_unique(&self, doc: NewDocument) -> anyhow::Result<InsertOutcome>;
    async fn fetch(&self, id: i64) -> anyhow::Result<Option<Document>>;
    /// Newest first.
    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Document>>;
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
    async fn update_classification(
        &self,
        id: i64,
        result: &ClassificationResult,
    ) -> anyhow::Result<bool>;
    /// `(content_hash, id, filename)` for every stored document.
    async fn all_hashes(&self) -> anyhow::Result<Vec<(String, i64, String)>>;
}

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn to_row(doc: &NewDocument) -> anyhow::Result<NewDocumentRow> {
    Ok(NewDocumentRow {
        filename: doc.filename.clone(),
        content_type: doc.content_type.clone(),
        size: i64::try_from(doc.size)?,
        content_hash: doc.content_hash.clone(),
        extracted_text: doc.extracted_text.clone(),
        classification_json: Some(serde_json::to_string(&doc.classification)?),
        top_category: doc.classification.top_category().map(str::to_string),
        uploaded_at: doc.uploaded_at.timestamp(),
    })
}

fn from_row(row: DocumentRow) -> Document {
    let classification = row.classification_json.as_deref().and_then(|json| {
        serde_json::from_str::<ClassificationResult>(json)
            .map_err(|e| warn!(document_id = row.id, error = %e, "unreadable classification"))
            .ok()
    });
    Document {
        id: row.id,
        filename: row.filename,
        content_type: row.content_type,
        size: u64::try_from(row.size).unwrap_or_default(),
        content_hash: row.content_hash,
        extracted_text: row.extracted_text,
        classification,
        uploaded_at: timestamp(row.uploaded_at),
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

/// Second precision, matching what the SQLite store keeps.
fn stored(doc: NewDocument, id: i64) -> Document {
    Document {
        id,
        filename: doc.filename,
        content_type: doc.content_type,
        size: doc.size,
        content_hash: doc.content_hash,
        extracted_text: doc.extracted_text,
        classification: Some(doc.classification),
        uploaded_at: timestamp(doc.uploaded_at.timestamp()),
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert_unique(&self, doc: NewDocument) -> anyhow::Result<InsertOutcome> {
        let row = to_row(&doc)?;
        match documents::insert_unique(&self.pool, &row).await? {
            storage::models::InsertOutcome::Inserted(id) => {
                Ok(InsertOutcome::Inserted(stored(doc, id)))
            }
            storage::models::InsertOutcome::Existing { id, filename } => {
                Ok(InsertOutcome::Existing { id, filename })
            }
        }
    }

    async fn fetch(&self, id: i64) -> anyhow::Result<Option<Document>> {
        Ok(documents::fetch(&self.pool, id).await?.map(from_row))
    }

    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Document>> {
        let query = ListQuery {
            top_category: filter.category.clone(),
            limit: filter.limit.map(i64::try_from).transpose()?,
            offset: i64::try_from(filter.offset)?,
        };
        let rows = documents::list(&self.pool, &query).await?;
        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        documents::delete(&self.pool, id).await
    }

    async fn update_classification(
        &self,
        id: i64,
        result: &ClassificationResult,
    ) -> anyhow::Result<bool> {
        let json = serde_json::to_string(result)?;
        documents::update_classification(&self.pool, id, &json, result.top_category()).await
    }

    async fn all_hashes(&self) -> anyhow::Result<Vec<(String, i64, String)>> {
        documents::all_hashes(&self.pool).await
    }
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    documents: BTreeMap<i64, Document>,
}

/// In-process store with the same insert-unique semantics as SQLite.
#[derive(Default)]
pub struct MemoryDocumentStore {
    state: Mutex<MemoryState>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.documents.len()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_unique(&self, doc: NewDocument) -> anyhow::Result<InsertOutcome> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .documents
            .values()
            .find(|d| d.content_hash == doc.content_hash)
        {
            return Ok(InsertOutcome::Existing {
                id: existing.id,
                filename: existing.filename.clone(),
            });
        }
        state.next_id += 1;
        let id = state.next_id;
        let document = stored(doc, id);
        state.documents.insert(id, document.clone());
        Ok(InsertOutcome::Inserted(document))
    }

    async fn fetch(&self, id: i64) -> anyhow::Result<Option<Document>> {
        Ok(self.state.lock().await.documents.get(&id).cloned())
    }

    async fn list(&self, filter: &ListFilter) -> anyhow::Result<Vec<Document>> {
        let state = self.state.lock().await;
        let mut docs: Vec<Document> = state
            .documents
            .values()
            .filter(|d| match &filter.category {
                Some(c) => d.top_category() == Some(c.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        Ok(docs
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.state.lock().await.documents.remove(&id).is_some())
    }

    async fn update_classification(
        &self,
        id: i64,
        result: &ClassificationResult,
    ) -> anyhow::Result<bool> {
        let mut state = self.state.lock().await;
        match state.documents.get_mut(&id) {
            Some(doc) => {
                doc.classification = Some(result.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn all_hashes(&self) -> anyhow::Result<Vec<(String, i64, String)>> {
        Ok(self
            .state
            .lock()
            .await
            .documents
            .values()
            .map(|d| (d.content_hash.clone(), d.id, d.filename.clone()))
            .collect())
    }
}
