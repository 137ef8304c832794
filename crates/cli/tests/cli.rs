use cli::render;
use cli::uploads::{self, FileStatus};
use doc_classifier_core::analytics::GroundTruth;
use doc_classifier_core::config::AppConfig;
use doc_classifier_core::store::ListFilter;
use doc_classifier_core::{Engine, ExtractionError};
use std::fs;
use tempfile::tempdir;

const LIMIT: usize = 10 * 1024 * 1024;

async fn engine() -> Engine {
    let mut cfg = AppConfig::default();
    cfg.database.path = "sqlite::memory:".into();
    cfg.embeddings.dimensions = 128;
    Engine::from_config(cfg).await.unwrap()
}

#[tokio::test]
async fn ingest_directory_reports_each_file() {
    let temp = tempdir().unwrap();
    let root = temp.path().join("docs");
    fs::create_dir_all(&root).unwrap();
    fs::write(
        root.join("a.txt"),
        "Quarterly revenue grew by twelve percent.\nOperating costs were flat.",
    )
    .unwrap();
    fs::write(
        root.join("b.txt"),
        "quarterly revenue grew by twelve percent.   operating costs were flat.",
    )
    .unwrap();
    fs::write(root.join("c.txt"), [0xffu8, 0xfe, 0x00]).unwrap();
    fs::write(
        root.join("d.md"),
        "This agreement is made between the landlord and the tenant of the premises.",
    )
    .unwrap();
    fs::write(root.join("e.png"), "not text").unwrap();

    let engine = engine().await;
    let outcomes = uploads::ingest_dir(&engine, &root).await.unwrap();
    let statuses: Vec<_> = outcomes.iter().map(|o| o.status.clone()).collect();
    assert_eq!(
        statuses,
        vec![
            FileStatus::Created,
            FileStatus::Duplicate,
            FileStatus::Failed,
            FileStatus::Created
        ]
    );
    assert_eq!(outcomes[1].existing_id, outcomes[0].document_id);
    assert!(outcomes[2].error.as_deref().unwrap().contains("UTF-8"));
    assert!(outcomes[0].category.is_some());

    let docs = engine.list(&ListFilter::default()).await.unwrap();
    assert_eq!(docs.len(), 2);

    let json = serde_json::to_value(&outcomes).unwrap();
    assert_eq!(json[1]["status"], "duplicate");
    assert!(json[0].get("error").is_none());
}

#[tokio::test]
async fn read_upload_guesses_content_type() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("Notes.MD");
    fs::write(&path, "hello").unwrap();
    let upload = uploads::read_upload(&path, None, LIMIT).unwrap();
    assert_eq!(upload.filename, "Notes.MD");
    assert_eq!(upload.content_type, "text/plain");

    let path = temp.path().join("blob.bin");
    fs::write(&path, "x").unwrap();
    let upload = uploads::read_upload(&path, None, LIMIT).unwrap();
    assert_eq!(upload.content_type, "application/octet-stream");
    let outcome = uploads::ingest_file(&engine().await, &path, None).await;
    assert_eq!(outcome.status, FileStatus::Failed);

    assert!(uploads::read_upload(&temp.path().join("missing.txt"), None, LIMIT).is_err());
}

#[tokio::test]
async fn rendered_output_names_every_category() {
    let engine = engine().await;
    let result = engine
        .classify("The court ruled that the contract was void under state law.")
        .await
        .unwrap();
    let text = render::classification(&result);
    for name in engine.registry().names() {
        assert!(text.contains(&name), "missing {name} in {text}");
    }

    let listing = render::registry(engine.registry());
    assert!(listing.contains("Other (fallback)"));

    let gt = GroundTruth::from_pairs([("a.txt", "Other")]);
    let report = engine.statistics(Some(&gt)).await.unwrap();
    let out = render::report(&report);
    assert!(out.starts_with("documents: 0 (0 skipped)"));
    assert!(out.contains("accuracy: 0.0% (0/0 labeled, 0 unlabeled)"));
    assert!(out.contains("top words:"));
}

#[tokio::test]
async fn oversized_file_is_rejected_before_reading() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("big.txt");
    let file = fs::File::create(&path).unwrap();
    // sparse: no data is written, only the length
    file.set_len(64 * 1024 * 1024).unwrap();

    let err = uploads::read_upload(&path, None, LIMIT).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ExtractionError>(),
        Some(ExtractionError::TooLarge { limit: LIMIT, .. })
    ));

    let engine = engine().await;
    let outcome = uploads::ingest_file(&engine, &path, None).await;
    assert_eq!(outcome.status, FileStatus::Failed);
    assert!(outcome.error.as_deref().unwrap().contains("limit"));
    assert!(engine.list(&ListFilter::default()).await.unwrap().is_empty());
}
