//! Core library: extraction, chunking, embedding, zero-shot classification,
//! duplicate detection, persistence and corpus analytics.

pub mod analytics;
pub mod chunker;
pub mod classifier;
pub mod config;
pub mod duplicates;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod models;
pub mod pca;
pub mod pipeline;
pub mod registry;
pub mod scanner;
pub mod store;
pub mod text;
pub mod wordcloud;

pub use classifier::{classify, TextClassifier};
pub use config::AppConfig;
pub use error::{EmbeddingError, ExtractionError, IngestError, RegistryError};
pub use pipeline::{Engine, IngestOutcome, ReclassifySummary, Upload};
pub use registry::CategoryRegistry;
