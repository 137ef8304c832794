use async_trait::async_trait;
use doc_classifier_core::config::{AppConfig, CategorySpec};
use doc_classifier_core::embeddings::Embedder;
use doc_classifier_core::duplicates::content_hash;
use doc_classifier_core::models::{CategoryScore, ClassificationResult, DuplicateOutcome, NewDocument};
use doc_classifier_core::store::{
    DocumentStore, InsertOutcome, ListFilter, MemoryDocumentStore, SqliteDocumentStore,
};
use doc_classifier_core::{Engine, IngestError, IngestOutcome, Upload};
use providers::{EmbedResponse, EmbeddingProvider, ProviderError};
use std::sync::Arc;

/// One dimension per keyword group plus a constant bias dimension. Texts
/// containing "explode" fail.
struct KeywordProvider;

const GROUPS: &[&[&str]] = &[
    &["budget", "revenue", "finance", "invoice"],
    &["contract", "agreement", "legal", "tenant"],
];

#[async_trait]
impl EmbeddingProvider for KeywordProvider {
    async fn embed(&self, texts: &[String]) -> Result<EmbedResponse, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            if text.contains("explode") {
                return Err(ProviderError::RequestFailed("model crashed".into()));
            }
            let mut v: Vec<f32> = GROUPS
                .iter()
                .map(|group| {
                    text.split_whitespace()
                        .filter(|w| group.iter().any(|k| w.contains(k)))
                        .count() as f32
                })
                .collect();
            v.push(0.1);
            vectors.push(v);
        }
        Ok(EmbedResponse { vectors })
    }

    fn model_id(&self) -> String {
        "keywords".into()
    }
}

fn config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.database.path = "sqlite::memory:".into();
    cfg.classification.categories = vec![
        CategorySpec::new("Finance", "finance reports budget revenue"),
        CategorySpec::new("Legal", "legal contracts agreement"),
        CategorySpec::new("Other", "miscellaneous notes"),
    ];
    cfg
}

async fn engine_with(store: Arc<dyn DocumentStore>) -> Engine {
    let embedder = Embedder::new(Arc::new(KeywordProvider), 8);
    Engine::new(config(), embedder, store).await.unwrap()
}

async fn memory_engine() -> Engine {
    engine_with(Arc::new(MemoryDocumentStore::new())).await
}

fn upload(name: &str, text: &str) -> Upload {
    Upload {
        filename: name.into(),
        content_type: "text/plain".into(),
        bytes: text.as_bytes().to_vec(),
    }
}

const LEASE: &str = "This lease agreement is a binding contract between landlord and tenant.\n\
                     The tenant agrees to the legal terms of this agreement.";
const REPORT: &str = "The quarterly finance report shows revenue above budget for the year.";

#[tokio::test]
async fn ingest_classifies_and_persists() {
    let engine = memory_engine().await;
    let outcome = engine.ingest(upload("lease.txt", LEASE)).await.unwrap();
    let document = match outcome {
        IngestOutcome::Created { document } => document,
        other => panic!("expected created, got {other:?}"),
    };
    assert_eq!(document.top_category(), Some("Legal"));
    let result = document.classification.as_ref().unwrap();
    assert_eq!(result.scores.len(), 3);
    assert!((result.total() - 1.0).abs() < 1e-6);
    assert_eq!(document.size, LEASE.len() as u64);

    let stored = engine.fetch(document.id).await.unwrap().unwrap();
    assert_eq!(stored.content_hash, document.content_hash);
}

#[tokio::test]
async fn reformatted_content_is_a_duplicate() {
    let engine = memory_engine().await;
    let first = match engine.ingest(upload("lease.txt", LEASE)).await.unwrap() {
        IngestOutcome::Created { document } => document,
        other => panic!("expected created, got {other:?}"),
    };
    let reexported = LEASE.replace('\n', "\r\n\r\n").to_uppercase();
    match engine.ingest(upload("lease-copy.txt", &reexported)).await.unwrap() {
        IngestOutcome::Duplicate {
            existing_id,
            existing_filename,
            ..
        } => {
            assert_eq!(existing_id, first.id);
            assert_eq!(existing_filename, "lease.txt");
        }
        other => panic!("expected duplicate, got {other:?}"),
    }
    assert_eq!(engine.list(&ListFilter::default()).await.unwrap().len(), 1);
    assert!(matches!(
        engine.check_duplicate(&reexported).await,
        DuplicateOutcome::Duplicate { .. }
    ));
    assert_eq!(
        engine.check_duplicate("The tenant agrees to other terms.").await,
        DuplicateOutcome::Unique
    );
}

#[tokio::test]
async fn failures_persist_nothing() {
    let engine = memory_engine().await;
    let bad_bytes = Upload {
        filename: "bad.txt".into(),
        content_type: "text/plain".into(),
        bytes: vec![0xff, 0xfe, 0xfd],
    };
    let err = engine.ingest(bad_bytes).await.unwrap_err();
    assert!(matches!(err, IngestError::Extraction(_)));
    assert!(err.is_user_facing());

    let err = engine
        .ingest(upload("boom.txt", "This document will explode the embedding model badly."))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Embedding(_)));
    assert!(!err.is_user_facing());

    assert!(engine.list(&ListFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_text_goes_to_fallback() {
    let engine = memory_engine().await;
    let document = match engine.ingest(upload("blank.txt", "  \n\n  ")).await.unwrap() {
        IngestOutcome::Created { document } => document,
        other => panic!("expected created, got {other:?}"),
    };
    let result = document.classification.unwrap();
    assert!(result.degenerate);
    assert_eq!(result.top_category(), Some("Other"));
    assert_eq!(result.get("Other"), Some(1.0));
}

#[tokio::test]
async fn racing_uploads_keep_one_document() {
    let pool = storage::connect("sqlite::memory:").await.unwrap();
    storage::migrate(&pool).await.unwrap();
    let engine = Arc::new(engine_with(Arc::new(SqliteDocumentStore::new(pool))).await);

    let mut handles = Vec::new();
    for i in 0..6 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .ingest(upload(&format!("report-{i}.txt"), REPORT))
                .await
                .unwrap()
        }));
    }
    let mut created = 0;
    let mut duplicates = 0;
    for h in handles {
        match h.await.unwrap() {
            IngestOutcome::Created { .. } => created += 1,
            IngestOutcome::Duplicate { .. } => duplicates += 1,
        }
    }
    assert_eq!((created, duplicates), (1, 5));
    assert_eq!(engine.list(&ListFilter::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_frees_the_content_hash() {
    let engine = memory_engine().await;
    let id = match engine.ingest(upload("r.txt", REPORT)).await.unwrap() {
        IngestOutcome::Created { document } => document.id,
        other => panic!("expected created, got {other:?}"),
    };
    assert!(engine.delete(id).await.unwrap());
    assert!(!engine.delete(id).await.unwrap());
    assert!(matches!(
        engine.ingest(upload("r2.txt", REPORT)).await.unwrap(),
        IngestOutcome::Created { .. }
    ));
}

#[tokio::test]
async fn reclassify_runs_in_background() {
    let engine = memory_engine().await;
    engine.ingest(upload("lease.txt", LEASE)).await.unwrap();
    engine.ingest(upload("report.txt", REPORT)).await.unwrap();
    engine.ingest(upload("blank.txt", "")).await.unwrap();

    let docs = engine.list(&ListFilter::default()).await.unwrap();
    let handle = engine.reclassify_all(docs);
    assert_eq!(handle.queued, 2);
    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
}

fn stale_result() -> ClassificationResult {
    ClassificationResult {
        scores: vec![
            CategoryScore { category: "Finance".into(), confidence: 0.0 },
            CategoryScore { category: "Legal".into(), confidence: 0.0 },
            CategoryScore { category: "Other".into(), confidence: 1.0 },
        ],
        degenerate: false,
    }
}

async fn store_with_stale_result(engine: &Engine, name: &str, text: &str) -> i64 {
    let doc = NewDocument {
        filename: name.into(),
        content_type: "text/plain".into(),
        size: text.len() as u64,
        content_hash: content_hash(text),
        extracted_text: text.into(),
        classification: stale_result(),
        uploaded_at: chrono::Utc::now(),
    };
    match engine.store().insert_unique(doc).await.unwrap() {
        InsertOutcome::Inserted(document) => document.id,
        InsertOutcome::Existing { .. } => panic!("{name} already stored"),
    }
}

#[tokio::test]
async fn reclassify_failure_keeps_previous_result() {
    let engine = memory_engine().await;
    let broken = store_with_stale_result(
        &engine,
        "broken.txt",
        "This contract will explode the embedding model.",
    )
    .await;
    let report = store_with_stale_result(&engine, "report.txt", REPORT).await;

    let docs = engine.list(&ListFilter::default()).await.unwrap();
    let handle = engine.reclassify_all(docs);
    assert_eq!(handle.queued, 2);
    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 0);

    let kept = engine.fetch(broken).await.unwrap().unwrap();
    assert_eq!(kept.classification, Some(stale_result()));
    let updated = engine.fetch(report).await.unwrap().unwrap();
    assert_eq!(updated.top_category(), Some("Finance"));
}

#[tokio::test]
async fn statistics_over_stored_documents() {
    let engine = memory_engine().await;
    let empty = engine.statistics(None).await.unwrap();
    assert_eq!(empty.total_documents, 0);
    assert!(empty.categories.iter().all(|c| c.count == 0 && c.average_confidence == 0.0));

    engine.ingest(upload("lease.txt", LEASE)).await.unwrap();
    engine.ingest(upload("report.txt", REPORT)).await.unwrap();
    engine
        .ingest(upload(
            "invoice.txt",
            "Invoice for consulting services, payable from the marketing budget.",
        ))
        .await
        .unwrap();

    let report = engine.statistics(None).await.unwrap();
    assert_eq!(report.total_documents, 3);
    assert_eq!(report.skipped_records, 0);
    assert_eq!(report.category("Finance").unwrap().count, 2);
    assert_eq!(report.category("Legal").unwrap().count, 1);
    assert_eq!(report.pca.points.len(), 3);
    assert!(report.word_clouds.iter().any(|w| w.category == "Other" && w.placeholder));

    let finance = engine
        .list(&ListFilter {
            category: Some("Finance".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(finance.len(), 2);
}

#[tokio::test]
async fn engine_from_config_uses_hashing_provider() {
    let mut cfg = AppConfig::default();
    cfg.database.path = "sqlite::memory:".into();
    let engine = Engine::from_config(cfg).await.unwrap();
    assert_eq!(engine.registry().len(), 6);
    assert_eq!(engine.registry().fallback().name, "Other");

    let result = engine
        .classify("The parties agree that this contract is governed by the laws of the state.")
        .await
        .unwrap();
    assert_eq!(result.scores.len(), 6);
    assert!((result.total() - 1.0).abs() < 1e-6);
    let again = engine
        .classify("The parties agree that this contract is governed by the laws of the state.")
        .await
        .unwrap();
    assert_eq!(result, again);

    let noise = engine.classify("--- ... !!! ???").await.unwrap();
    assert!(noise.degenerate);
    assert_eq!(noise.top_category(), Some("Other"));
    assert_eq!(noise.get("Other"), Some(1.0));
}
