//! Corpus indexing, hybrid retrieval and graded question answering.
//!
//! Tables live under `.ragcheck/knowledge/<table>/` in a workspace: a
//! `config.yaml` recording how the table was built, and a storage directory
//! holding the SQLite or LanceDB index.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod ingest;
pub mod rag;
pub mod rerank;
pub mod retriever;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use rag::{
    AccuracyMetric, AnswerEvaluator, AnswerGenerator, Assistant, AssistantResponse, Evaluation,
    Prediction,
};
pub use rerank::{LinearCombinationReranker, RankedPassage};
pub use retriever::{Retriever, CONTEXT_SEPARATOR};
pub use store::{open_store, HybridHits, IndexStore, TableStatus};
pub use types::{
    IngestOptions, IngestStats, KnowledgeBaseConfig, StoreBackend, TableStats, DEFAULT_CHUNK_SIZE,
    DEFAULT_TABLE, DEFAULT_TOP_K,
};

use chrono::Utc;
use ragcheck_core::{AppError, AppResult};
use ragcheck_llm::LlmClient;
use ragcheck_prompt::{load_task, ANSWER_TASK_ID, EVALUATE_TASK_ID};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Open the index store a table's configuration points at.
pub async fn open_table_store(
    workspace: &Path,
    config: &KnowledgeBaseConfig,
) -> AppResult<Arc<dyn IndexStore>> {
    let embedder = embeddings::create_provider(&config.embedding)?;
    let location = config::get_storage_dir(workspace, config);
    open_store(
        config.backend,
        &location,
        embedder,
        config.embedding.batch_size,
    )
    .await
}

/// Chunk and index a corpus into a table.
///
/// An already-ingested table is kept as is unless `reset` is set. Changing
/// the backend or the embedding model of an existing table requires a reset.
pub async fn ingest(workspace: &Path, options: IngestOptions) -> AppResult<IngestStats> {
    let start = Instant::now();
    store::validate_table_name(&options.table)?;

    tracing::info!("Starting ingestion into table '{}'", options.table);

    let previous = config::load_config(workspace, &options.table)?;
    let ingested_before = previous.last_ingested_at.is_some();

    if options.reset && ingested_before {
        tracing::info!("Resetting table '{}'", options.table);
        let store = open_table_store(workspace, &previous).await?;
        store.drop_table(&options.table).await?;
    }

    let mut config = previous.clone();
    if let Some(chunk_size) = options.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(location) = options.location {
        config.location = Some(location);
    }
    if let Some(backend) = options.backend {
        config.backend = backend;
    }
    if let Some(embedding) = options.embedding {
        config.embedding = embedding;
    }

    if ingested_before && !options.reset {
        if config.backend != previous.backend {
            return Err(AppError::Config(format!(
                "Table '{}' is stored with {}; re-ingest with --reset to switch to {}",
                options.table, previous.backend, config.backend
            )));
        }
        previous.embedding.validate_consistency(&config.embedding)?;
    }

    let store = open_table_store(workspace, &config).await?;
    let load =
        ingest::load_corpus(store.as_ref(), &options.table, &options.text, config.chunk_size)
            .await?;

    if load.status.is_created() {
        config.last_ingested_at = Some(Utc::now());
        config::save_config(workspace, &config)?;
    } else if !ingested_before {
        // Table already in the store but unknown to this workspace
        config::save_config(workspace, &config)?;
    }

    let duration = start.elapsed();

    tracing::info!(
        "Ingestion completed: {} chunks, {} rows ({}) in {:.2}s",
        load.chunks,
        load.status.rows(),
        if load.status.is_created() { "created" } else { "existing" },
        duration.as_secs_f64()
    );

    Ok(IngestStats {
        table: options.table,
        backend: config.backend,
        location: store.location().to_path_buf(),
        chunks: load.chunks,
        rows: load.status.rows(),
        created: load.status.is_created(),
        duration_secs: duration.as_secs_f64(),
    })
}

/// Retriever over a configured table, fusing with the table's reranker
/// weight.
pub async fn retriever(workspace: &Path, table: &str) -> AppResult<Retriever> {
    store::validate_table_name(table)?;
    let config = config::load_config(workspace, table)?;
    let reranker = LinearCombinationReranker::new(config.reranker_weight)?;
    let store = open_table_store(workspace, &config).await?;
    Ok(Retriever::new(store, table).with_reranker(reranker))
}

/// Assistant over a configured table, using workspace task overrides when
/// present. `top_k` falls back to the table's configured value.
pub async fn assistant(
    workspace: &Path,
    table: &str,
    client: Arc<dyn LlmClient>,
    model: &str,
    top_k: Option<usize>,
) -> AppResult<Assistant> {
    let config = config::load_config(workspace, table)?;
    let retriever = retriever(workspace, table).await?;

    let generator =
        AnswerGenerator::with_task(client.clone(), model, load_task(workspace, ANSWER_TASK_ID)?);
    let evaluator =
        AnswerEvaluator::with_task(client, model, load_task(workspace, EVALUATE_TASK_ID)?);

    Assistant::new(retriever, generator, evaluator).with_top_k(top_k.unwrap_or(config.top_k))
}

/// Get statistics for a table.
pub async fn stats(workspace: &Path, table: &str) -> AppResult<TableStats> {
    tracing::info!("Getting stats for table '{}'", table);
    store::validate_table_name(table)?;

    let config = config::load_config(workspace, table)?;
    let store = open_table_store(workspace, &config).await?;

    let exists = store.table_exists(table).await?;
    let rows = if exists { store.count_rows(table).await? } else { 0 };

    Ok(TableStats {
        table: table.to_string(),
        backend: config.backend,
        location: store.location().to_path_buf(),
        exists,
        rows,
        chunk_size: config.chunk_size,
        top_k: config.top_k,
        reranker_weight: config.reranker_weight,
        embedding: config.embedding,
        last_ingested_at: config.last_ingested_at,
    })
}
