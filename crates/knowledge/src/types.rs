//! Knowledge system type definitions.

use crate::embeddings::EmbeddingConfig;
use crate::rerank::DEFAULT_VECTOR_WEIGHT;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default table name for an ingested corpus.
pub const DEFAULT_TABLE: &str = "context";

/// Default number of words per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Default number of passages kept after fusion.
pub const DEFAULT_TOP_K: usize = 3;

/// Storage backend for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite file with an FTS5 lexical index and stored vectors
    #[default]
    Sqlite,
    /// LanceDB dataset with native full-text and vector search
    LanceDb,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "lancedb" | "lance" => Some(Self::LanceDb),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::LanceDb => "lancedb",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one ingested table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// Table name
    pub table: String,

    /// Words per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Passages kept after fusion
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Weight of the vector score when fusing hits, within [0, 1]
    #[serde(default = "default_reranker_weight")]
    pub reranker_weight: f32,

    /// Storage backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// Storage directory override; defaults to the table's state directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<PathBuf>,

    /// Embedding settings the table was built with
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// When the table was last (re)built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_ingested_at: Option<DateTime<Utc>>,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

fn default_reranker_weight() -> f32 {
    DEFAULT_VECTOR_WEIGHT
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
            reranker_weight: DEFAULT_VECTOR_WEIGHT,
            backend: StoreBackend::default(),
            location: None,
            embedding: EmbeddingConfig::default(),
            last_ingested_at: None,
        }
    }
}

/// Options for ingesting one corpus.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Target table
    pub table: String,

    /// Raw corpus text
    pub text: String,

    /// Words per chunk (falls back to the table config)
    pub chunk_size: Option<usize>,

    /// Backend override (falls back to the table config)
    pub backend: Option<StoreBackend>,

    /// Storage directory override
    pub location: Option<PathBuf>,

    /// Embedding settings override
    pub embedding: Option<EmbeddingConfig>,

    /// Drop the table before ingesting
    pub reset: bool,
}

impl IngestOptions {
    pub fn new(table: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            text: text.into(),
            chunk_size: None,
            backend: None,
            location: None,
            embedding: None,
            reset: false,
        }
    }
}

/// Outcome of an ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStats {
    pub table: String,
    pub backend: StoreBackend,
    pub location: PathBuf,
    pub chunks: usize,
    pub rows: usize,
    /// False when the table already existed and was left untouched
    pub created: bool,
    pub duration_secs: f64,
}

/// Statistics for one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStats {
    pub table: String,
    pub backend: StoreBackend,
    pub location: PathBuf,
    pub exists: bool,
    pub rows: usize,
    pub chunk_size: usize,
    pub top_k: usize,
    pub reranker_weight: f32,
    pub embedding: EmbeddingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ingested_at: Option<DateTime<Utc>>,
}
