use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cli::render;
use cli::uploads::{self, FileStatus};
use doc_classifier_core::analytics::GroundTruth;
use doc_classifier_core::config;
use doc_classifier_core::store::ListFilter;
use doc_classifier_core::Engine;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    let cfg = config::load(cli.config.as_deref())?;
    let engine = Engine::from_config(cfg).await?;

    match cli.command {
        Commands::Upload {
            file,
            content_type,
            json,
        } => run_upload(&engine, file, content_type, json).await,
        Commands::Ingest { dir, json } => run_ingest(&engine, dir, json).await,
        Commands::Classify { text, file, json } => run_classify(&engine, text, file, json).await,
        Commands::List {
            category,
            limit,
            offset,
            json,
        } => {
            let filter = ListFilter {
                category,
                limit,
                offset,
            };
            run_list(&engine, &filter, json).await
        }
        Commands::Show { id, json } => run_show(&engine, id, json).await,
        Commands::Delete { id } => {
            if engine.delete(id).await? {
                println!("deleted document {id}");
                Ok(())
            } else {
                bail!("document {id} not found")
            }
        }
        Commands::Stats { labels, json } => run_stats(&engine, labels, json).await,
        Commands::Reclassify => run_reclassify(&engine).await,
        Commands::Categories { json } => {
            if json {
                let cats: Vec<_> = engine
                    .registry()
                    .categories()
                    .iter()
                    .map(|c| serde_json::json!({ "name": c.name, "description": c.description }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&cats)?);
            } else {
                print!("{}", render::registry(engine.registry()));
            }
            Ok(())
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Parser)]
#[command(name = "doc-classifier")]
#[command(about = "Zero-shot document classification with duplicate detection and corpus analytics", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Log filter, e.g. `debug` or `doc_classifier_core=trace` (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one file: extract, check for duplicates, classify and store
    Upload {
        file: PathBuf,
        /// Content type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload every supported file under a directory
    Ingest {
        dir: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Classify text without storing it
    Classify {
        /// Text to classify
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,
        /// File whose extracted text is classified
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored documents, newest first
    List {
        /// Only documents whose top category is this
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one document with its full classification
    Show {
        id: i64,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a document
    Delete { id: i64 },
    /// Corpus statistics, PCA projection, accuracy and word clouds
    Stats {
        /// TOML file with a `[labels]` table of `filename = "Category"`
        #[arg(long)]
        labels: Option<PathBuf>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Reclassify every stored document against the current categories
    Reclassify,
    /// Print the configured categories in declaration order
    Categories {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

async fn run_upload(
    engine: &Engine,
    file: PathBuf,
    content_type: Option<String>,
    json: bool,
) -> Result<()> {
    let upload = uploads::read_upload(
        &file,
        content_type.as_deref(),
        engine.config().ingestion.max_upload_bytes,
    )?;
    let outcome = engine.ingest(upload).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    match outcome {
        doc_classifier_core::IngestOutcome::Created { document } => {
            println!("stored {} as document {}", document.filename, document.id);
            if let Some(c) = &document.classification {
                print!("{}", render::classification(c));
            }
        }
        doc_classifier_core::IngestOutcome::Duplicate {
            existing_id,
            existing_filename,
            ..
        } => {
            println!(
                "duplicate: same content as document {existing_id} ({existing_filename}), not stored"
            );
        }
    }
    Ok(())
}

async fn run_ingest(engine: &Engine, dir: PathBuf, json: bool) -> Result<()> {
    let outcomes = uploads::ingest_dir(engine, &dir).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }
    let mut counts = [0usize; 3];
    for o in &outcomes {
        let detail = match o.status {
            FileStatus::Created => {
                counts[0] += 1;
                format!(
                    "created #{} {}",
                    o.document_id.unwrap_or_default(),
                    o.category.as_deref().unwrap_or("-")
                )
            }
            FileStatus::Duplicate => {
                counts[1] += 1;
                format!("duplicate of #{}", o.existing_id.unwrap_or_default())
            }
            FileStatus::Failed => {
                counts[2] += 1;
                format!("failed: {}", o.error.as_deref().unwrap_or("unknown error"))
            }
        };
        println!("{}  {}", o.path.display(), detail);
    }
    println!(
        "{} created, {} duplicates, {} failed",
        counts[0], counts[1], counts[2]
    );
    Ok(())
}

async fn run_classify(
    engine: &Engine,
    text: Option<String>,
    file: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let text = match (text, file) {
        (Some(t), _) => t,
        (None, Some(path)) => {
            let upload =
                uploads::read_upload(&path, None, engine.config().ingestion.max_upload_bytes)?;
            doc_classifier_core::extractor::extract(
                &upload.bytes,
                &upload.content_type,
                &upload.filename,
                engine.config().ingestion.max_upload_bytes,
            )
            .with_context(|| format!("extract {}", path.display()))?
        }
        (None, None) => bail!("pass --text or --file"),
    };
    let result = engine.classify(&text).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render::classification(&result));
    }
    Ok(())
}

async fn run_list(engine: &Engine, filter: &ListFilter, json: bool) -> Result<()> {
    let docs = engine.list(filter).await?;
    if json {
        let rows: Vec<_> = docs
            .iter()
            .map(|d| {
                serde_json::json!({
                    "id": d.id,
                    "filename": d.filename,
                    "content_type": d.content_type,
                    "size": d.size,
                    "uploaded_at": d.uploaded_at,
                    "top_category": d.top_category(),
                    "classification": d.classification.as_ref().map(|c| c.to_map()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if docs.is_empty() {
        println!("no documents");
    }
    for d in &docs {
        println!("{}", render::document_line(d));
    }
    Ok(())
}

async fn run_show(engine: &Engine, id: i64, json: bool) -> Result<()> {
    let Some(doc) = engine.fetch(id).await? else {
        bail!("document {id} not found");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print!("{}", render::document_detail(&doc));
    }
    Ok(())
}

async fn run_stats(engine: &Engine, labels: Option<PathBuf>, json: bool) -> Result<()> {
    let ground_truth = labels.as_deref().map(GroundTruth::load).transpose()?;
    let report = engine.statistics(ground_truth.as_ref()).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::report(&report));
    }
    Ok(())
}

async fn run_reclassify(engine: &Engine) -> Result<()> {
    let docs = engine.list(&ListFilter::default()).await?;
    let handle = engine.reclassify_all(docs);
    println!("queued {} documents for reclassification", handle.queued);
    let summary = handle.wait().await?;
    println!(
        "reclassified {}, skipped {}, failed {}",
        summary.updated, summary.skipped, summary.failed
    );
    Ok(())
}
