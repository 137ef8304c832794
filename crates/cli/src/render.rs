//! Plain-text output for the non-JSON mode of each command.

use doc_classifier_core::analytics::AnalyticsReport;
use doc_classifier_core::models::{ClassificationResult, Document};
use doc_classifier_core::registry::CategoryRegistry;
use std::fmt::Write;

/// Ranked `category  confidence%` lines, top first.
pub fn classification(result: &ClassificationResult) -> String {
    let width = result
        .scores
        .iter()
        .map(|s| s.category.chars().count())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for score in result.ranked() {
        let _ = writeln!(
            out,
            "  {:<width$}  {:>6.2}%",
            score.category,
            score.confidence * 100.0
        );
    }
    if result.degenerate {
        out.push_str("  (no usable text; low-confidence result)\n");
    }
    out
}

pub fn document_line(doc: &Document) -> String {
    let top = doc
        .classification
        .as_ref()
        .and_then(|c| c.top())
        .map(|t| format!("{} ({:.1}%)", t.category, t.confidence * 100.0))
        .unwrap_or_else(|| "unclassified".to_string());
    format!(
        "{:>5}  {}  {:<32}  {}",
        doc.id,
        doc.uploaded_at.format("%Y-%m-%d %H:%M"),
        doc.filename,
        top
    )
}

pub fn document_detail(doc: &Document) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "id:           {}", doc.id);
    let _ = writeln!(out, "filename:     {}", doc.filename);
    let _ = writeln!(out, "content type: {}", doc.content_type);
    let _ = writeln!(out, "size:         {} bytes", doc.size);
    let _ = writeln!(out, "uploaded:     {}", doc.uploaded_at.to_rfc3339());
    let _ = writeln!(out, "hash:         {}", doc.content_hash);
    let _ = writeln!(out, "text length:  {} chars", doc.extracted_text.chars().count());
    match &doc.classification {
        Some(c) => {
            out.push_str("classification:\n");
            out.push_str(&classification(c));
        }
        None => out.push_str("classification: none\n"),
    }
    out
}

pub fn registry(reg: &CategoryRegistry) -> String {
    let mut out = String::new();
    for (i, category) in reg.categories().iter().enumerate() {
        let marker = if i == reg.fallback_index() { " (fallback)" } else { "" };
        let _ = writeln!(out, "{}. {}{}", i + 1, category.name, marker);
        let _ = writeln!(out, "   {}", category.description);
    }
    let _ = writeln!(out, "model: {}, dimension: {}", reg.model_id(), reg.dimension());
    out
}

pub fn report(report: &AnalyticsReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "documents: {} ({} skipped)",
        report.total_documents, report.skipped_records
    );
    let width = report
        .categories
        .iter()
        .map(|c| c.category.chars().count())
        .max()
        .unwrap_or(0);
    let _ = writeln!(
        out,
        "  {:<width$}  {:>5}  {:>8}  {:>10}  {:>10}",
        "category", "count", "avg conf", "avg bytes", "avg chars"
    );
    for c in &report.categories {
        let _ = writeln!(
            out,
            "  {:<width$}  {:>5}  {:>7.1}%  {:>10.0}  {:>10.0}",
            c.category,
            c.count,
            c.average_confidence * 100.0,
            c.average_size,
            c.average_length
        );
    }

    let _ = writeln!(
        out,
        "pca: {} points, explained variance {:.1}% / {:.1}%",
        report.pca.points.len(),
        report.pca.explained_variance[0] * 100.0,
        report.pca.explained_variance[1] * 100.0
    );
    for p in &report.pca.points {
        let _ = writeln!(
            out,
            "  {:>5}  {:>8.4}  {:>8.4}  {}",
            p.document_id, p.x, p.y, p.top_category
        );
    }

    if let Some(acc) = &report.accuracy {
        let _ = writeln!(
            out,
            "accuracy: {:.1}% ({}/{} labeled, {} unlabeled)",
            acc.overall * 100.0,
            acc.correct,
            acc.evaluated,
            acc.unlabeled
        );
        for c in acc.per_category.iter().filter(|c| c.total > 0) {
            let _ = writeln!(
                out,
                "  {:<width$}  {:>5.1}%  ({}/{})",
                c.category,
                c.precision * 100.0,
                c.correct,
                c.total
            );
        }
    }

    out.push_str("top words:\n");
    for cloud in &report.word_clouds {
        let words: Vec<String> = cloud
            .words
            .iter()
            .take(10)
            .map(|w| {
                if cloud.placeholder {
                    w.word.clone()
                } else {
                    format!("{}({})", w.word, w.count)
                }
            })
            .collect();
        let _ = writeln!(out, "  {:<width$}  {}", cloud.category, words.join(" "));
    }
    out
}
