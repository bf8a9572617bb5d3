//! LanceDB-backed index store.
//!
//! One LanceDB table per store table, with a full-text index on `text`.
//! Vector hits are rescored by cosine similarity against the stored
//! embeddings so both backends report the same scale.
//!
//! A table only counts as built once its full-text index exists. Searches
//! in this process wait behind a build; a table another process is still
//! indexing reports `RetrievalUnavailable` instead of partial results.

use crate::embeddings::{cosine_similarity, embed_in_batches, EmbeddingProvider};
use crate::store::{
    build_passages, candidate_limit, lexical_terms, missing_table, validate_table_name,
    HybridHits, IndexStore, Passage, ScoredPassage, TableStatus,
};
use crate::types::StoreBackend;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
    UInt32Array,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::index::scalar::{FtsIndexBuilder, FullTextSearchQuery};
use lancedb::index::Index;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use ragcheck_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Column carrying the full-text index.
const TEXT_COLUMN: &str = "text";

fn lance_err(context: &str, e: lancedb::Error) -> AppError {
    AppError::RetrievalUnavailable(format!("{}: {}", context, e))
}

/// LanceDB index store.
pub struct LanceDbStore {
    location: PathBuf,
    conn: Connection,
    ingest_lock: tokio::sync::RwLock<()>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl LanceDbStore {
    /// Connect to (or create) the database in `location`.
    pub async fn open(location: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        std::fs::create_dir_all(location).map_err(|e| {
            AppError::RetrievalUnavailable(format!(
                "Failed to create index directory {:?}: {}",
                location, e
            ))
        })?;

        let uri = location.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| lance_err("Failed to connect to LanceDB", e))?;

        tracing::debug!("Opened LanceDB index at {:?}", location);

        Ok(Self {
            location: location.to_path_buf(),
            conn,
            ingest_lock: tokio::sync::RwLock::new(()),
            embedder,
            batch_size: 100,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    fn schema(&self) -> Arc<Schema> {
        passage_schema(self.embedder.dimensions())
    }

    async fn has_table(&self, name: &str) -> AppResult<bool> {
        let names = self
            .conn
            .table_names()
            .execute()
            .await
            .map_err(|e| lance_err("Failed to list tables", e))?;
        Ok(names.iter().any(|n| n == name))
    }

    async fn open_table(&self, name: &str) -> AppResult<Table> {
        if !self.has_table(name).await? {
            return Err(missing_table(name));
        }
        self.conn
            .open_table(name)
            .execute()
            .await
            .map_err(|e| lance_err("Failed to open table", e))
    }

    async fn rows_in(&self, name: &str) -> AppResult<usize> {
        self.open_table(name)
            .await?
            .count_rows(None)
            .await
            .map_err(|e| lance_err("Failed to count rows", e))
    }

    fn table_dir(&self, name: &str) -> PathBuf {
        self.location.join(format!("{}.lance", name))
    }

    fn remove_table_dir(&self, name: &str) -> AppResult<()> {
        let dir = self.table_dir(name);
        std::fs::remove_dir_all(&dir).map_err(|e| {
            AppError::RetrievalUnavailable(format!("Failed to remove table {:?}: {}", dir, e))
        })
    }

    /// Build the full-text index on `column`. On failure the table is
    /// removed so the next ingestion starts from scratch.
    async fn index_or_discard(&self, name: &str, table: &Table, column: &str) -> AppResult<()> {
        let indexed = table
            .create_index(&[column], Index::FTS(FtsIndexBuilder::default()))
            .execute()
            .await;

        if let Err(e) = indexed {
            tracing::warn!("Full-text index on '{}' failed, removing table: {}", name, e);
            self.remove_table_dir(name)?;
            return Err(lance_err("Failed to build full-text index", e));
        }
        Ok(())
    }

    /// Rebuild the full-text index of an existing table if it is missing.
    async fn repair_text_index(&self, name: &str) -> AppResult<()> {
        let table = self.open_table(name).await?;
        if has_text_index(&table).await? {
            return Ok(());
        }

        tracing::warn!("Table '{}' has no full-text index, rebuilding", name);
        table
            .create_index(&[TEXT_COLUMN], Index::FTS(FtsIndexBuilder::default()))
            .execute()
            .await
            .map_err(|e| lance_err("Failed to rebuild full-text index", e))
    }

    fn to_batch(&self, passages: &[Passage]) -> AppResult<RecordBatch> {
        let dimensions = self.embedder.dimensions();

        let ids = StringArray::from(passages.iter().map(|p| p.id.as_str()).collect::<Vec<_>>());
        let positions = UInt32Array::from(passages.iter().map(|p| p.position).collect::<Vec<_>>());
        let texts =
            StringArray::from(passages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>());

        let values: Vec<f32> = passages.iter().flat_map(|p| p.vector.iter().copied()).collect();
        let vectors = FixedSizeListArray::new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            dimensions as i32,
            Arc::new(Float32Array::from(values)),
            None,
        );

        RecordBatch::try_new(
            self.schema(),
            vec![
                Arc::new(ids),
                Arc::new(positions),
                Arc::new(texts),
                Arc::new(vectors),
            ],
        )
        .map_err(|e| AppError::RetrievalUnavailable(format!("Failed to build record batch: {}", e)))
    }

    async fn lexical_hits(
        &self,
        table: &Table,
        query: &str,
        limit: usize,
    ) -> AppResult<Vec<ScoredPassage>> {
        let terms = lexical_terms(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        if !has_text_index(table).await? {
            return Err(AppError::RetrievalUnavailable(format!(
                "table '{}' has no full-text index yet; retry once ingestion finishes",
                table.name()
            )));
        }

        let batches: Vec<RecordBatch> = table
            .query()
            .full_text_search(FullTextSearchQuery::new(terms.join(" ")))
            .limit(limit)
            .execute()
            .await
            .map_err(|e| lance_err("Failed to execute full-text search", e))?
            .try_collect()
            .await
            .map_err(|e| lance_err("Failed to collect full-text results", e))?;

        let mut hits = Vec::new();
        for batch in &batches {
            let ids = string_column(batch, "id")?;
            let texts = string_column(batch, "text")?;
            let scores = float_column(batch, "_score")?;
            for row in 0..batch.num_rows() {
                hits.push(ScoredPassage {
                    id: ids.value(row).to_string(),
                    text: texts.value(row).to_string(),
                    score: scores.value(row),
                });
            }
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn vector_hits(
        &self,
        table: &Table,
        query_vector: &[f32],
        limit: usize,
    ) -> AppResult<Vec<ScoredPassage>> {
        let batches: Vec<RecordBatch> = table
            .query()
            .nearest_to(query_vector.to_vec())
            .map_err(|e| lance_err("Failed to create vector query", e))?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| lance_err("Failed to execute vector search", e))?
            .try_collect()
            .await
            .map_err(|e| lance_err("Failed to collect vector results", e))?;

        let mut hits = Vec::new();
        for batch in &batches {
            let ids = string_column(batch, "id")?;
            let texts = string_column(batch, "text")?;
            let vectors = batch
                .column_by_name("vector")
                .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>())
                .ok_or_else(|| invalid_column("vector"))?;

            for row in 0..batch.num_rows() {
                let stored = vectors.value(row);
                let values = stored
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .ok_or_else(|| invalid_column("vector"))?;
                hits.push(ScoredPassage {
                    id: ids.value(row).to_string(),
                    text: texts.value(row).to_string(),
                    score: cosine_similarity(query_vector, values.values()),
                });
            }
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Arrow schema of a passage table with `dimensions`-wide vectors.
pub fn passage_schema(dimensions: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("position", DataType::UInt32, false),
        Field::new("text", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                dimensions as i32,
            ),
            false,
        ),
    ]))
}

async fn has_text_index(table: &Table) -> AppResult<bool> {
    let indices = table
        .list_indices()
        .await
        .map_err(|e| lance_err("Failed to list indices", e))?;
    Ok(indices
        .iter()
        .any(|index| index.columns.iter().any(|c| c == TEXT_COLUMN)))
}

fn invalid_column(name: &str) -> AppError {
    AppError::RetrievalUnavailable(format!("Invalid '{}' column in LanceDB result", name))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| invalid_column(name))
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a Float32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| invalid_column(name))
}

#[async_trait::async_trait]
impl IndexStore for LanceDbStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::LanceDb
    }

    fn location(&self) -> &Path {
        &self.location
    }

    async fn ensure_table(&self, name: &str, passages: &[String]) -> AppResult<TableStatus> {
        validate_table_name(name)?;
        let _ingesting = self.ingest_lock.write().await;

        if self.has_table(name).await? {
            self.repair_text_index(name).await?;
            let rows = self.rows_in(name).await?;
            tracing::debug!("Table '{}' already exists ({} rows)", name, rows);
            return Ok(TableStatus::Existing { rows });
        }

        if passages.is_empty() {
            return Err(AppError::InvalidArgument(format!(
                "cannot create table '{}' from zero passages",
                name
            )));
        }

        let vectors = embed_in_batches(self.embedder.as_ref(), passages, self.batch_size).await?;
        let rows = build_passages(passages, vectors);
        let batch = self.to_batch(&rows)?;

        let created = self
            .conn
            .create_table(name, RecordBatchIterator::new(vec![Ok(batch)], self.schema()))
            .execute()
            .await;

        let table = match created {
            Ok(table) => table,
            // Another process got there first
            Err(lancedb::Error::TableAlreadyExists { .. }) => {
                let rows = self.rows_in(name).await?;
                tracing::info!("Table '{}' was created concurrently; skipping ingestion", name);
                return Ok(TableStatus::Existing { rows });
            }
            Err(e) => return Err(lance_err("Failed to create table", e)),
        };

        self.index_or_discard(name, &table, TEXT_COLUMN).await?;

        tracing::info!("Created table '{}' with {} passages", name, rows.len());
        Ok(TableStatus::Created { rows: rows.len() })
    }

    async fn hybrid_search(&self, name: &str, query: &str, top_k: usize) -> AppResult<HybridHits> {
        validate_table_name(name)?;
        let _reading = self.ingest_lock.read().await;
        let table = self.open_table(name).await?;

        let query_vector = self.embedder.embed(query).await?;
        let limit = candidate_limit(top_k);

        let hits = HybridHits {
            lexical: self.lexical_hits(&table, query, limit).await?,
            vector: self.vector_hits(&table, &query_vector, limit).await?,
        };

        tracing::debug!(
            "Hybrid search on '{}': {} lexical, {} vector hits",
            name,
            hits.lexical.len(),
            hits.vector.len()
        );
        Ok(hits)
    }

    async fn table_exists(&self, name: &str) -> AppResult<bool> {
        validate_table_name(name)?;
        self.has_table(name).await
    }

    async fn count_rows(&self, name: &str) -> AppResult<usize> {
        validate_table_name(name)?;
        self.rows_in(name).await
    }

    async fn drop_table(&self, name: &str) -> AppResult<bool> {
        validate_table_name(name)?;
        let _ingesting = self.ingest_lock.write().await;

        if !self.has_table(name).await? {
            return Ok(false);
        }

        self.remove_table_dir(name)?;

        tracing::info!("Dropped table '{}'", name);
        Ok(true)
    }
}
