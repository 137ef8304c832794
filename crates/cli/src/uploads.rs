use anyhow::Context;
use doc_classifier_core::extractor;
use doc_classifier_core::{Engine, ExtractionError, IngestOutcome, Upload};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Reads `path` into an upload. The content type is guessed from the
/// extension unless given; unknown extensions fall back to
/// `application/octet-stream` and are rejected by extraction. Files over
/// `max_bytes` are rejected from their metadata without being read.
pub fn read_upload(
    path: &Path,
    content_type: Option<&str>,
    max_bytes: usize,
) -> anyhow::Result<Upload> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    if size > max_bytes as u64 {
        return Err(ExtractionError::TooLarge {
            actual: usize::try_from(size).unwrap_or(usize::MAX),
            limit: max_bytes,
        }
        .into());
    }
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    let content_type = content_type
        .map(str::to_string)
        .or_else(|| extractor::guess_content_type(&filename).map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(Upload {
        filename,
        content_type,
        bytes,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Created,
    Duplicate,
    Failed,
}

/// Per-file result of a directory ingest.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    fn failed(path: PathBuf, error: String) -> Self {
        Self {
            path,
            status: FileStatus::Failed,
            document_id: None,
            category: None,
            existing_id: None,
            error: Some(error),
        }
    }
}

pub async fn ingest_file(engine: &Engine, path: &Path, content_type: Option<&str>) -> FileOutcome {
    let max_bytes = engine.config().ingestion.max_upload_bytes;
    let upload = match read_upload(path, content_type, max_bytes) {
        Ok(u) => u,
        Err(e) => return FileOutcome::failed(path.to_path_buf(), format!("{e:#}")),
    };
    match engine.ingest(upload).await {
        Ok(IngestOutcome::Created { document }) => FileOutcome {
            path: path.to_path_buf(),
            status: FileStatus::Created,
            document_id: Some(document.id),
            category: document.top_category().map(str::to_string),
            existing_id: None,
            error: None,
        },
        Ok(IngestOutcome::Duplicate { existing_id, .. }) => FileOutcome {
            path: path.to_path_buf(),
            status: FileStatus::Duplicate,
            document_id: None,
            category: None,
            existing_id: Some(existing_id),
            error: None,
        },
        Err(e) => FileOutcome::failed(path.to_path_buf(), e.to_string()),
    }
}

/// Uploads every supported file under `root`, one at a time. A failing file
/// is reported and the walk continues.
pub async fn ingest_dir(engine: &Engine, root: &Path) -> anyhow::Result<Vec<FileOutcome>> {
    let files = doc_classifier_core::scanner::scan(
        &[root.to_path_buf()],
        &engine.config().ingestion.scan_exclude,
    )
    .await
    .with_context(|| format!("scan {}", root.display()))?;
    info!(files = files.len(), root = %root.display(), "ingesting directory");

    let mut outcomes = Vec::with_capacity(files.len());
    for file in files {
        let outcome = ingest_file(engine, &file.path, Some(file.content_type)).await;
        if let Some(err) = &outcome.error {
            warn!(path = %file.path.display(), error = %err, "ingest failed");
        }
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
