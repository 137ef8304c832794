//! Walks directories for files the extractor can read.

use crate::extractor;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
    pub content_type: &'static str,
}

/// Files under `roots` with a supported extension, sorted by path. Hidden
/// entries and anything matching `excludes` are skipped, directories included.
pub async fn scan(roots: &[PathBuf], excludes: &[String]) -> anyhow::Result<Vec<ScannedFile>> {
    let (tx, mut rx) = mpsc::channel(100);
    let exclude_set = build_globset(excludes)?;
    let roots = roots.to_vec();

    let walker_handle = task::spawn_blocking(move || {
        for root in roots {
            for entry in WalkDir::new(&root)
                .follow_links(true)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || should_descend(e.path(), &exclude_set))
            {
                let entry = match entry {
                    Ok(e) => e,
                    Err(err) => {
                        debug!(error = %err, "skipping unreadable entry");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                let Some(content_type) = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(extractor::guess_content_type)
                else {
                    continue;
                };
                let size = entry.metadata().map(|m| m.len()).unwrap_or_default();
                let item = ScannedFile {
                    path: path.to_path_buf(),
                    size,
                    content_type,
                };
                if tx.blocking_send(item).is_err() {
                    // Receiver dropped, stop walking.
                    return;
                }
            }
        }
    });

    let mut files = Vec::new();
    while let Some(item) = rx.recv().await {
        files.push(item);
    }
    walker_handle.await?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files.dedup_by(|a, b| a.path == b.path);
    Ok(files)
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    Ok(builder.build()?)
}

fn should_descend(path: &Path, excludes: &GlobSet) -> bool {
    !is_hidden(path) && !excludes.is_match(path)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn finds_supported_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("drafts")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.pdf"), "%PDF").unwrap();
        fs::write(root.join("sub/c.docx"), "c").unwrap();
        fs::write(root.join("image.png"), "p").unwrap();
        fs::write(root.join(".hidden.txt"), "h").unwrap();
        fs::write(root.join(".git/config.txt"), "g").unwrap();
        fs::write(root.join("drafts/d.txt"), "d").unwrap();

        let files = scan(&[root.to_path_buf()], &["**/drafts".to_string()])
            .await
            .unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.txt", "sub/c.docx"]);
        assert_eq!(files[1].content_type, extractor::TEXT_PLAIN);
        assert_eq!(files[1].size, 1);
    }

    #[tokio::test]
    async fn bad_glob_is_an_error() {
        assert!(scan(&[], &["[".to_string()]).await.is_err());
    }
}
