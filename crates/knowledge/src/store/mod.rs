//! Index store: persisted passages with a lexical index and vectors.
//!
//! A store owns named tables. `ensure_table` builds a table once (first
//! writer wins) and `hybrid_search` returns raw, unfused lexical and vector
//! hit lists for the retriever to combine.

pub mod lance;
pub mod sqlite;

pub use self::lance::LanceDbStore;
pub use self::sqlite::SqliteStore;

use crate::embeddings::EmbeddingProvider;
use crate::types::StoreBackend;
use ragcheck_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Suffix of the lexical index kept beside each table.
pub const INDEX_SUFFIX: &str = "_fts";

/// Minimum number of hits requested per modality.
const MIN_CANDIDATES: usize = 10;

/// Hits requested from each modality for a given `top_k`.
pub fn candidate_limit(top_k: usize) -> usize {
    top_k.saturating_mul(3).max(MIN_CANDIDATES)
}

/// Table names are interpolated into storage identifiers, so only
/// `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn validate_table_name(name: &str) -> AppResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if !valid {
        return Err(AppError::InvalidArgument(format!(
            "invalid table name '{}': use letters, digits and underscores, not starting with a digit",
            name
        )));
    }

    // Stores keep a lexical index beside each table as `<name>_fts`, which
    // SQLite shadows with `<name>_fts_<suffix>` tables. Identifiers are
    // case-insensitive there.
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(INDEX_SUFFIX) || lower.contains("_fts_") || lower.starts_with("sqlite_") {
        return Err(AppError::InvalidArgument(format!(
            "invalid table name '{}': names ending in '{}', containing '_fts_' or starting with 'sqlite_' are reserved",
            name, INDEX_SUFFIX
        )));
    }

    Ok(())
}

/// Lowercased alphanumeric terms of a query, in order, without duplicates.
pub fn lexical_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
    {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// A stored passage row.
#[derive(Debug, Clone, PartialEq)]
pub struct Passage {
    pub id: String,
    pub position: u32,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Pair chunk texts with their vectors, assigning fresh ids.
pub(crate) fn build_passages(texts: &[String], vectors: Vec<Vec<f32>>) -> Vec<Passage> {
    texts
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(position, (text, vector))| Passage {
            id: uuid::Uuid::new_v4().to_string(),
            position: position as u32,
            text: text.clone(),
            vector,
        })
        .collect()
}

/// Outcome of `ensure_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TableStatus {
    /// This call ingested the passages.
    Created { rows: usize },
    /// The table was already there; nothing was written.
    Existing { rows: usize },
}

impl TableStatus {
    pub fn rows(&self) -> usize {
        match self {
            Self::Created { rows } | Self::Existing { rows } => *rows,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// One hit from a single modality. Higher scores are better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub id: String,
    pub text: String,
    pub score: f32,
}

/// Raw results of a hybrid query, each list best-first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridHits {
    pub lexical: Vec<ScoredPassage>,
    pub vector: Vec<ScoredPassage>,
}

/// A passage seen by at least one modality, deduplicated by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub text: String,
    pub lexical_score: Option<f32>,
    pub vector_score: Option<f32>,
    /// Position in the lexical list, if the passage was a lexical hit
    pub lexical_rank: Option<usize>,
}

impl HybridHits {
    /// Merge both lists into one candidate per passage. Lexical hits come
    /// first in lexical order, then vector-only hits in vector order. A
    /// passage repeated within one list keeps its first (best) score.
    pub fn candidates(&self) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for (rank, hit) in self.lexical.iter().enumerate() {
            if index.contains_key(hit.id.as_str()) {
                continue;
            }
            index.insert(hit.id.as_str(), candidates.len());
            candidates.push(Candidate {
                id: hit.id.clone(),
                text: hit.text.clone(),
                lexical_score: Some(hit.score),
                vector_score: None,
                lexical_rank: Some(rank),
            });
        }

        for hit in &self.vector {
            match index.get(hit.id.as_str()) {
                Some(&i) => {
                    if candidates[i].vector_score.is_none() {
                        candidates[i].vector_score = Some(hit.score);
                    }
                }
                None => {
                    index.insert(hit.id.as_str(), candidates.len());
                    candidates.push(Candidate {
                        id: hit.id.clone(),
                        text: hit.text.clone(),
                        lexical_score: None,
                        vector_score: Some(hit.score),
                        lexical_rank: None,
                    });
                }
            }
        }

        candidates
    }

    pub fn is_empty(&self) -> bool {
        self.lexical.is_empty() && self.vector.is_empty()
    }
}

/// Persistent passage store with hybrid search.
#[async_trait::async_trait]
pub trait IndexStore: Send + Sync {
    /// Backend kind, for reporting.
    fn backend(&self) -> StoreBackend;

    /// Storage directory.
    fn location(&self) -> &Path;

    /// Create and fill `name` from `passages` unless it already exists.
    ///
    /// Concurrent callers are serialized: exactly one ingests, the rest get
    /// `TableStatus::Existing`. Creating a table from zero passages is
    /// `InvalidArgument`.
    async fn ensure_table(&self, name: &str, passages: &[String]) -> AppResult<TableStatus>;

    /// Lexical and vector hits for `query`, each list holding at most
    /// `candidate_limit(top_k)` entries. A missing table is
    /// `RetrievalUnavailable`.
    async fn hybrid_search(&self, name: &str, query: &str, top_k: usize)
        -> AppResult<HybridHits>;

    async fn table_exists(&self, name: &str) -> AppResult<bool>;

    /// Row count of an existing table.
    async fn count_rows(&self, name: &str) -> AppResult<usize>;

    /// Remove a table; returns false if it did not exist.
    async fn drop_table(&self, name: &str) -> AppResult<bool>;
}

/// Open the store for `backend` rooted at `location`.
pub async fn open_store(
    backend: StoreBackend,
    location: &Path,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
) -> AppResult<Arc<dyn IndexStore>> {
    tracing::debug!("Opening {} store at {:?}", backend, location);

    Ok(match backend {
        StoreBackend::Sqlite => {
            Arc::new(SqliteStore::open(location, embedder)?.with_batch_size(batch_size))
        }
        StoreBackend::LanceDb => Arc::new(
            LanceDbStore::open(location, embedder)
                .await?
                .with_batch_size(batch_size),
        ),
    })
}

pub(crate) fn missing_table(name: &str) -> AppError {
    AppError::RetrievalUnavailable(format!(
        "table '{}' does not exist; ingest a corpus first",
        name
    ))
}
