use crate::models::{DocumentRow, InsertOutcome, ListQuery, NewDocumentRow};
use sqlx::SqlitePool;
use tracing::debug;

const SELECT_COLUMNS: &str = "SELECT id, filename, content_type, size, content_hash, extracted_text, \
     classification_json, top_category, uploaded_at FROM documents";

/// Inserts the row unless its content hash is already taken, in which case
/// the owner of that hash is returned instead. Both branches run against the
/// UNIQUE constraint, so concurrent callers cannot both insert.
pub async fn insert_unique(pool: &SqlitePool, doc: &NewDocumentRow) -> anyhow::Result<InsertOutcome> {
    // The conflicting row can be deleted before it is looked up; a second
    // attempt covers that window.
    for _ in 0..2 {
        if let Some(id) = try_insert(pool, doc).await? {
            debug!(id, hash = %doc.content_hash, "document inserted");
            return Ok(InsertOutcome::Inserted(id));
        }
        if let Some((id, filename)) = owner_of_hash(pool, &doc.content_hash).await? {
            debug!(id, hash = %doc.content_hash, "content hash already present");
            return Ok(InsertOutcome::Existing { id, filename });
        }
        debug!(hash = %doc.content_hash, "conflicting row vanished, retrying insert");
    }
    anyhow::bail!("content hash {} conflicts but has no owner", doc.content_hash)
}

async fn try_insert(pool: &SqlitePool, doc: &NewDocumentRow) -> anyhow::Result<Option<i64>> {
    let res = sqlx::query(
        r#"
        INSERT INTO documents
            (filename, content_type, size, content_hash, extracted_text, classification_json, top_category, uploaded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(content_hash) DO NOTHING
        "#,
    )
    .bind(&doc.filename)
    .bind(&doc.content_type)
    .bind(doc.size)
    .bind(&doc.content_hash)
    .bind(&doc.extracted_text)
    .bind(&doc.classification_json)
    .bind(&doc.top_category)
    .bind(doc.uploaded_at)
    .execute(pool)
    .await?;
    Ok((res.rows_affected() == 1).then(|| res.last_insert_rowid()))
}

async fn owner_of_hash(pool: &SqlitePool, hash: &str) -> anyhow::Result<Option<(i64, String)>> {
    let owner = sqlx::query_as("SELECT id, filename FROM documents WHERE content_hash = ?1")
        .bind(hash)
        .fetch_optional(pool)
        .await?;
    Ok(owner)
}

pub async fn fetch(pool: &SqlitePool, id: i64) -> anyhow::Result<Option<DocumentRow>> {
    let row = sqlx::query_as::<_, DocumentRow>(&format!("{SELECT_COLUMNS} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Newest first.
pub async fn list(pool: &SqlitePool, query: &ListQuery) -> anyhow::Result<Vec<DocumentRow>> {
    let limit = query.limit.unwrap_or(-1);
    let rows = match &query.top_category {
        Some(category) => {
            sqlx::query_as::<_, DocumentRow>(&format!(
                "{SELECT_COLUMNS} WHERE top_category = ?1 ORDER BY uploaded_at DESC, id DESC LIMIT ?2 OFFSET ?3"
            ))
            .bind(category)
            .bind(limit)
            .bind(query.offset)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DocumentRow>(&format!(
                "{SELECT_COLUMNS} ORDER BY uploaded_at DESC, id DESC LIMIT ?1 OFFSET ?2"
            ))
            .bind(limit)
            .bind(query.offset)
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

/// Returns true when a row was removed.
pub async fn delete(pool: &SqlitePool, id: i64) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM documents WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn update_classification(
    pool: &SqlitePool,
    id: i64,
    classification_json: &str,
    top_category: Option<&str>,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "UPDATE documents SET classification_json = ?2, top_category = ?3 WHERE id = ?1",
    )
    .bind(id)
    .bind(classification_json)
    .bind(top_category)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn all_hashes(pool: &SqlitePool) -> anyhow::Result<Vec<(String, i64, String)>> {
    let rows: Vec<(String, i64, String)> =
        sqlx::query_as("SELECT content_hash, id, filename FROM documents ORDER BY id")
            .fetch_all(pool)
            .await?;
    Ok(rows)
}
