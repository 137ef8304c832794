use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/documents.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `hashing` (offline) or `openai`.
    pub provider: String,
    pub model: String,
    pub batch_size: usize,
    /// Width of the hashing provider's vectors.
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "text-embedding-3-small".to_string(),
            batch_size: 32,
            dimensions: 384,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Chunks shorter than this are merged into the preceding chunk.
    pub min_chars: usize,
    pub max_chars: usize,
    /// Only the first `max_chunks` chunks are scored; 0 keeps all.
    pub max_chunks: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_chars: 40,
            max_chars: 512,
            max_chunks: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// All confidence goes to the fallback category.
    #[default]
    Other,
    /// Confidence is spread evenly over every category.
    Uniform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    pub description: String,
}

impl CategorySpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub fallback_category: String,
    pub degenerate_policy: DegeneratePolicy,
    /// Normalize case, whitespace and numbers before embedding.
    pub preprocess: bool,
    pub categories: Vec<CategorySpec>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            fallback_category: "Other".to_string(),
            degenerate_policy: DegeneratePolicy::Other,
            preprocess: true,
            categories: default_categories(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub max_upload_bytes: usize,
    /// Glob patterns skipped when ingesting a directory.
    #[serde(default)]
    pub scan_exclude: Vec<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            scan_exclude: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub top_words: usize,
    /// Tokens shorter than this are left out of word clouds.
    pub min_token_len: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_words: 50,
            min_token_len: 4,
        }
    }
}

pub fn default_categories() -> Vec<CategorySpec> {
    vec![
        CategorySpec::new(
            "Technical Documentation",
            "Precise technical specifications, operational procedures and implementation \
             guidelines for a technology, engineered system, hardware component or software \
             application, with diagrams, code samples and configuration parameters, written \
             as a reference for skilled practitioners.",
        ),
        CategorySpec::new(
            "Business Proposal",
            "A commercial proposition presenting a tailored solution to a prospective client's \
             business needs, with a value proposition, scope of work, pricing structure and \
             forecast return on investment, written to secure a business agreement.",
        ),
        CategorySpec::new(
            "Legal Document",
            "Legally binding terms, conditions, rights or obligations: contracts, agreements, \
             litigation filings, regulatory compliance documents or formal legal opinions, \
             written in precise legal terminology with a formal structure.",
        ),
        CategorySpec::new(
            "Academic Paper",
            "Original research findings, theoretical frameworks or critical analyses for a \
             field of academic inquiry, with a literature review, methodology, evidence and \
             citations, written for a specialized scholarly audience.",
        ),
        CategorySpec::new(
            "General Article",
            "News, reports on current events, feature stories, opinion pieces or commentary \
             for the general public, as published in newspapers, magazines or blogs, in clear \
             and accessible language.",
        ),
        CategorySpec::new(
            "Other",
            "A personal letter or email, creative writing, an internal memo, a conversation \
             transcript or raw data that does not fit technical, business, legal, academic \
             or general audience writing.",
        ),
    ]
}

/// Layers: built-in defaults, then the TOML file (`config/default` when no
/// path is given, optional), then `DOCCLS__SECTION__KEY` environment variables.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("DOCCLS")
            .prefix_separator("__")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_include_fallback_category() {
        let cfg = AppConfig::default();
        assert!(cfg
            .classification
            .categories
            .iter()
            .any(|c| c.name == cfg.classification.fallback_category));
        assert_eq!(cfg.classification.degenerate_policy, DegeneratePolicy::Other);
    }

    #[test]
    fn load_reads_toml_file_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(
            &path,
            r#"
            [database]
            path = "sqlite::memory:"

            [chunking]
            min_chars = 10
            max_chars = 100
            max_chunks = 0

            [classification]
            fallback_category = "Misc"
            degenerate_policy = "uniform"
            preprocess = false

            [[classification.categories]]
            name = "Finance"
            description = "finance reports"

            [[classification.categories]]
            name = "Misc"
            description = "anything else"
            "#,
        )
        .unwrap();

        let cfg = load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(cfg.database.path, "sqlite::memory:");
        assert_eq!(cfg.chunking.max_chars, 100);
        assert_eq!(cfg.classification.degenerate_policy, DegeneratePolicy::Uniform);
        assert_eq!(cfg.classification.categories.len(), 2);
        assert_eq!(cfg.embeddings.provider, "hashing");
        assert_eq!(cfg.analytics.top_words, 50);
    }
}
