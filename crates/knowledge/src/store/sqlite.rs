//! SQLite-backed index store.
//!
//! Each table `name` is a plain table of `(id, position, text, vector)`
//! rows plus an FTS5 table `name_fts` over the same text. Vectors are
//! little-endian `f32` blobs scored by cosine similarity in process.
//!
//! rusqlite is synchronous, so every database section runs on the blocking
//! pool via `spawn_blocking`.

use crate::embeddings::{cosine_similarity, embed_in_batches, EmbeddingProvider};
use crate::store::{
    build_passages, candidate_limit, lexical_terms, missing_table, validate_table_name,
    HybridHits, IndexStore, Passage, ScoredPassage, TableStatus, INDEX_SUFFIX,
};
use crate::types::StoreBackend;
use ragcheck_core::{AppError, AppResult};
use rusqlite::{params, Connection, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Database file inside the storage directory.
pub const INDEX_FILE: &str = "index.sqlite";

const BUSY_TIMEOUT_SECS: u64 = 30;

fn db_err(e: rusqlite::Error) -> AppError {
    AppError::RetrievalUnavailable(format!("SQLite error: {}", e))
}

fn fts_table(name: &str) -> String {
    format!("{}{}", name, INDEX_SUFFIX)
}

/// SQLite index store.
pub struct SqliteStore {
    location: PathBuf,
    conn: Arc<Mutex<Connection>>,
    ingest_lock: tokio::sync::Mutex<()>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl SqliteStore {
    /// Open (or create) the store in `location`.
    pub fn open(location: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        std::fs::create_dir_all(location).map_err(|e| {
            AppError::RetrievalUnavailable(format!(
                "Failed to create index directory {:?}: {}",
                location, e
            ))
        })?;

        let conn = Connection::open(location.join(INDEX_FILE)).map_err(db_err)?;
        conn.busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS))
            .map_err(db_err)?;

        tracing::debug!("Opened SQLite index at {:?}", location);
        Ok(Self::from_connection(location.to_path_buf(), conn, embedder))
    }

    /// In-memory store, mostly for tests.
    pub fn open_in_memory(embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Ok(Self::from_connection(
            PathBuf::from(":memory:"),
            conn,
            embedder,
        ))
    }

    fn from_connection(
        location: PathBuf,
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            location,
            conn: Arc::new(Mutex::new(conn)),
            ingest_lock: tokio::sync::Mutex::new(()),
            embedder,
            batch_size: 100,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| {
                AppError::RetrievalUnavailable("SQLite connection poisoned".to_string())
            })?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| AppError::RetrievalUnavailable(format!("SQLite task join error: {}", e)))?
    }
}

fn table_exists_in(conn: &Connection, name: &str) -> AppResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )
        .map_err(db_err)?;
    Ok(count > 0)
}

fn count_rows_in(conn: &Connection, name: &str) -> AppResult<usize> {
    let count: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {}", name), [], |row| {
            row.get(0)
        })
        .map_err(db_err)?;
    Ok(count as usize)
}

fn existing_rows(conn: &Connection, name: &str) -> AppResult<Option<usize>> {
    if table_exists_in(conn, name)? {
        Ok(Some(count_rows_in(conn, name)?))
    } else {
        Ok(None)
    }
}

/// Create and fill `name` in one IMMEDIATE transaction, unless another
/// writer got there first.
fn create_table_in(conn: &mut Connection, name: &str, rows: &[Passage]) -> AppResult<TableStatus> {
    // IMMEDIATE takes the write lock up front so another process
    // cannot create the table between the check and the inserts.
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(db_err)?;

    if let Some(rows) = existing_rows(&tx, name)? {
        tracing::info!("Table '{}' was created concurrently; skipping ingestion", name);
        return Ok(TableStatus::Existing { rows });
    }

    let fts = fts_table(name);
    tx.execute_batch(&format!(
        "CREATE TABLE {name} (
            id TEXT PRIMARY KEY,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            vector BLOB NOT NULL
        );
        CREATE VIRTUAL TABLE {fts} USING fts5(passage_id UNINDEXED, text);",
        name = name,
        fts = fts
    ))
    .map_err(db_err)?;

    {
        let mut insert = tx
            .prepare(&format!(
                "INSERT INTO {} (id, position, text, vector) VALUES (?1, ?2, ?3, ?4)",
                name
            ))
            .map_err(db_err)?;
        let mut insert_fts = tx
            .prepare(&format!(
                "INSERT INTO {} (passage_id, text) VALUES (?1, ?2)",
                fts
            ))
            .map_err(db_err)?;

        for passage in rows {
            insert
                .execute(params![
                    passage.id,
                    passage.position as i64,
                    passage.text,
                    vector_to_bytes(&passage.vector),
                ])
                .map_err(db_err)?;
            insert_fts
                .execute(params![passage.id, passage.text])
                .map_err(db_err)?;
        }
    }

    tx.commit().map_err(db_err)?;
    Ok(TableStatus::Created { rows: rows.len() })
}

fn lexical_hits(conn: &Connection, name: &str, query: &str, limit: usize) -> AppResult<Vec<ScoredPassage>> {
    let terms = lexical_terms(query);
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    // Quoted terms are literal strings to FTS5; OR keeps partial matches.
    let expression = terms
        .iter()
        .map(|t| format!("\"{}\"", t))
        .collect::<Vec<_>>()
        .join(" OR ");

    let sql = format!(
        "SELECT passage_id, text, -bm25({fts}) AS score FROM {fts} \
         WHERE {fts} MATCH ?1 ORDER BY score DESC, rowid ASC LIMIT ?2",
        fts = fts_table(name)
    );

    let mut stmt = conn.prepare(&sql).map_err(db_err)?;
    let rows = stmt
        .query_map(params![expression, limit as i64], |row| {
            Ok(ScoredPassage {
                id: row.get(0)?,
                text: row.get(1)?,
                score: row.get::<_, f64>(2)? as f32,
            })
        })
        .map_err(db_err)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
}

fn vector_hits(conn: &Connection, name: &str, query_vector: &[f32], limit: usize) -> AppResult<Vec<ScoredPassage>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT id, text, vector FROM {} ORDER BY position ASC",
            name
        ))
        .map_err(db_err)?;

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let text: String = row.get(1)?;
            let bytes: Vec<u8> = row.get(2)?;
            Ok((id, text, bytes))
        })
        .map_err(db_err)?;

    let mut hits = Vec::new();
    for row in rows {
        let (id, text, bytes) = row.map_err(db_err)?;
        let vector = bytes_to_vector(&bytes)?;
        hits.push(ScoredPassage {
            id,
            text,
            score: cosine_similarity(query_vector, &vector),
        });
    }

    // Stable: equal scores stay in position order
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    Ok(hits)
}

/// Convert a vector to bytes for storage.
fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert stored bytes back to a vector.
fn bytes_to_vector(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::RetrievalUnavailable(
            "Invalid vector bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[async_trait::async_trait]
impl IndexStore for SqliteStore {
    fn backend(&self) -> StoreBackend {
        StoreBackend::Sqlite
    }

    fn location(&self) -> &Path {
        &self.location
    }

    async fn ensure_table(&self, name: &str, passages: &[String]) -> AppResult<TableStatus> {
        validate_table_name(name)?;
        let _ingesting = self.ingest_lock.lock().await;

        let table = name.to_string();
        if let Some(rows) = self.with_conn(move |conn| existing_rows(conn, &table)).await? {
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

        let table = name.to_string();
        let status = self
            .with_conn(move |conn| create_table_in(conn, &table, &rows))
            .await?;

        if status.is_created() {
            tracing::info!("Created table '{}' with {} passages", name, status.rows());
        }
        Ok(status)
    }

    async fn hybrid_search(&self, name: &str, query: &str, top_k: usize) -> AppResult<HybridHits> {
        validate_table_name(name)?;
        let table = name.to_string();
        if !self.with_conn(move |conn| table_exists_in(conn, &table)).await? {
            return Err(missing_table(name));
        }

        let query_vector = self.embedder.embed(query).await?;
        let limit = candidate_limit(top_k);

        let table = name.to_string();
        let query = query.to_string();
        let hits = self
            .with_conn(move |conn| {
                Ok(HybridHits {
                    lexical: lexical_hits(conn, &table, &query, limit)?,
                    vector: vector_hits(conn, &table, &query_vector, limit)?,
                })
            })
            .await?;

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
        let table = name.to_string();
        self.with_conn(move |conn| table_exists_in(conn, &table)).await
    }

    async fn count_rows(&self, name: &str) -> AppResult<usize> {
        validate_table_name(name)?;
        let table = name.to_string();
        self.with_conn(move |conn| existing_rows(conn, &table))
            .await?
            .ok_or_else(|| missing_table(name))
    }

    async fn drop_table(&self, name: &str) -> AppResult<bool> {
        validate_table_name(name)?;
        let _ingesting = self.ingest_lock.lock().await;

        let table = name.to_string();
        let dropped = self
            .with_conn(move |conn| {
                if !table_exists_in(conn, &table)? {
                    return Ok(false);
                }
                conn.execute_batch(&format!(
                    "DROP TABLE IF EXISTS {fts}; DROP TABLE IF EXISTS {name};",
                    fts = fts_table(&table),
                    name = table
                ))
                .map_err(db_err)?;
                Ok(true)
            })
            .await?;

        if dropped {
            tracing::info!("Dropped table '{}'", name);
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use tempfile::TempDir;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory(Arc::new(MockProvider::new(64))).unwrap()
    }

    fn corpus() -> Vec<String> {
        vec![
            "Monday to Friday 9am-6pm, closed Sunday.".to_string(),
            "Parking is available behind the building.".to_string(),
            "Saturday hours are 10am to 2pm.".to_string(),
        ]
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let store = store();

        let first = store.ensure_table("context", &corpus()).await.unwrap();
        assert_eq!(first, TableStatus::Created { rows: 3 });

        let second = store.ensure_table("context", &corpus()).await.unwrap();
        assert_eq!(second, TableStatus::Existing { rows: 3 });
        assert_eq!(store.count_rows("context").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_existing_table_ignores_new_passages() {
        let store = store();
        store.ensure_table("context", &corpus()).await.unwrap();

        let status = store
            .ensure_table("context", &["something else".to_string()])
            .await
            .unwrap();
        assert_eq!(status.rows(), 3);
    }

    #[tokio::test]
    async fn test_empty_passages_rejected() {
        let err = store().ensure_table("context", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_hybrid_search_returns_both_modalities() {
        let store = store();
        store.ensure_table("context", &corpus()).await.unwrap();

        let hits = store
            .hybrid_search("context", "Saturday hours", 3)
            .await
            .unwrap();

        assert_eq!(hits.lexical.len(), 1);
        assert!(hits.lexical[0].text.starts_with("Saturday"));
        assert!(hits.lexical[0].score > 0.0);

        assert_eq!(hits.vector.len(), 3);
        assert!(hits.vector[0].text.starts_with("Saturday"));
        assert!(hits.vector[0].score >= hits.vector[1].score);
    }

    #[tokio::test]
    async fn test_hybrid_search_missing_table() {
        let err = store().hybrid_search("nope", "hours", 3).await.unwrap_err();
        assert!(matches!(err, AppError::RetrievalUnavailable(_)));
    }

    #[tokio::test]
    async fn test_punctuation_only_query_has_no_lexical_hits() {
        let store = store();
        store.ensure_table("context", &corpus()).await.unwrap();

        let hits = store.hybrid_search("context", "?!", 3).await.unwrap();
        assert!(hits.lexical.is_empty());
        assert_eq!(hits.vector.len(), 3);
    }

    #[tokio::test]
    async fn test_candidate_limit_caps_hits() {
        let store = store();
        let passages: Vec<String> = (0..25).map(|i| format!("shared word passage {}", i)).collect();
        store.ensure_table("many", &passages).await.unwrap();

        let hits = store.hybrid_search("many", "shared word", 1).await.unwrap();
        assert_eq!(hits.lexical.len(), 10);
        assert_eq!(hits.vector.len(), 10);

        let hits = store.hybrid_search("many", "shared word", 5).await.unwrap();
        assert_eq!(hits.lexical.len(), 15);
    }

    #[tokio::test]
    async fn test_drop_table() {
        let store = store();
        store.ensure_table("context", &corpus()).await.unwrap();

        assert!(store.drop_table("context").await.unwrap());
        assert!(!store.table_exists("context").await.unwrap());
        assert!(!store.drop_table("context").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_table_name() {
        let err = store()
            .ensure_table("context; DROP", &corpus())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_index_table_names_rejected() {
        let store = store();
        store.ensure_table("context", &corpus()).await.unwrap();

        let err = store
            .ensure_table("context_fts", &["Sunday is closed.".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        for name in ["context_fts", "context_fts_data", "CONTEXT_FTS_IDX"] {
            assert!(matches!(
                store.drop_table(name).await,
                Err(AppError::InvalidArgument(_))
            ));
        }

        let hits = store
            .hybrid_search("context", "Saturday hours", 3)
            .await
            .unwrap();
        assert!(hits.lexical[0].text.starts_with("Saturday"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_search_on_multi_thread_runtime() {
        let store = Arc::new(store());
        store.ensure_table("context", &corpus()).await.unwrap();

        let handles: Vec<_> = ["Saturday hours", "parking", "closed Sunday"]
            .into_iter()
            .map(|query| {
                let store = store.clone();
                tokio::spawn(async move { store.hybrid_search("context", query, 3).await })
            })
            .collect();

        for handle in handles {
            let hits = handle.await.unwrap().unwrap();
            assert!(!hits.lexical.is_empty());
            assert_eq!(hits.vector.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockProvider::new(64));

        {
            let store = SqliteStore::open(temp.path(), embedder.clone()).unwrap();
            store.ensure_table("context", &corpus()).await.unwrap();
        }

        let reopened = SqliteStore::open(temp.path(), embedder).unwrap();
        assert!(temp.path().join(INDEX_FILE).exists());
        assert_eq!(
            reopened.ensure_table("context", &corpus()).await.unwrap(),
            TableStatus::Existing { rows: 3 }
        );
    }

    #[tokio::test]
    async fn test_concurrent_ensure_table_single_writer() {
        let store = Arc::new(store());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.ensure_table("context", &corpus()).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_created() {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.count_rows("context").await.unwrap(), 3);
    }

    #[test]
    fn test_vector_bytes_roundtrip() {
        let vector = vec![0.25, -1.5, 3.0];
        assert_eq!(bytes_to_vector(&vector_to_bytes(&vector)).unwrap(), vector);
        assert!(bytes_to_vector(&[0, 1, 2]).is_err());
    }
}
