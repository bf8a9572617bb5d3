//! Corpus loading: chunk raw text and build a table from it.

use crate::chunker;
use crate::store::{IndexStore, TableStatus};
use ragcheck_core::{AppError, AppResult};

/// Result of loading one corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusLoad {
    /// Chunks produced from the text
    pub chunks: usize,
    pub status: TableStatus,
}

/// Chunk `text` into `chunk_size`-word passages and ensure `table` exists.
///
/// An existing table is left untouched; its row count is reported as is.
pub async fn load_corpus(
    store: &dyn IndexStore,
    table: &str,
    text: &str,
    chunk_size: usize,
) -> AppResult<CorpusLoad> {
    let chunks = chunker::split(text, chunk_size)?;
    if chunks.is_empty() {
        return Err(AppError::InvalidArgument(
            "corpus contains no words".to_string(),
        ));
    }

    tracing::info!(
        "Loading {} chunks of up to {} words into '{}'",
        chunks.len(),
        chunk_size,
        table
    );

    let status = store.ensure_table(table, &chunks).await?;
    Ok(CorpusLoad {
        chunks: chunks.len(),
        status,
    })
}
