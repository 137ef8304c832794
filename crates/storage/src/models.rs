use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: i64,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub content_hash: String,
    pub extracted_text: String,
    /// Serialized classification; `None` until classified or if it was lost.
    pub classification_json: Option<String>,
    pub top_category: Option<String>,
    /// Unix seconds.
    pub uploaded_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewDocumentRow {
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub content_hash: String,
    pub extracted_text: String,
    pub classification_json: Option<String>,
    pub top_category: Option<String>,
    pub uploaded_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// Another row already owns this content hash.
    Existing { id: i64, filename: String },
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub top_category: Option<String>,
    pub limit: Option<i64>,
    pub offset: i64,
}
