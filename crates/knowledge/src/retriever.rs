//! Hybrid retrieval: store query, fusion, top-K context assembly.

use crate::rerank::{LinearCombinationReranker, RankedPassage};
use crate::store::IndexStore;
use ragcheck_core::{AppError, AppResult};
use std::sync::Arc;

pub use crate::types::DEFAULT_TOP_K;

/// Literal separator placed between passages in an assembled context.
pub const CONTEXT_SEPARATOR: &str = "- context block: ";

/// Retrieves fused passages from one table of an index store.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn IndexStore>,
    table: String,
    reranker: LinearCombinationReranker,
}

impl Retriever {
    pub fn new(store: Arc<dyn IndexStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            reranker: LinearCombinationReranker::default(),
        }
    }

    pub fn with_reranker(mut self, reranker: LinearCombinationReranker) -> Self {
        self.reranker = reranker;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn store(&self) -> &Arc<dyn IndexStore> {
        &self.store
    }

    /// The `top_k` best passages for `query`, best first.
    ///
    /// Returns fewer than `top_k` when the table holds fewer passages.
    pub async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<RankedPassage>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidArgument("query must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(AppError::InvalidArgument("top_k must be at least 1".to_string()));
        }

        let hits = self.store.hybrid_search(&self.table, query, top_k).await?;
        let mut ranked = self.reranker.rerank(&hits);
        ranked.truncate(top_k);

        tracing::debug!(
            "Retrieved {} passages from '{}' (requested top-{})",
            ranked.len(),
            self.table,
            top_k
        );
        Ok(ranked)
    }

    /// Context string for `query`: the selected passages joined with
    /// [`CONTEXT_SEPARATOR`].
    pub async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<String> {
        let ranked = self.search(query, top_k).await?;
        Ok(assemble_context(&ranked))
    }
}

/// Join passage texts into a single context string.
pub fn assemble_context(passages: &[RankedPassage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use crate::store::SqliteStore;

    async fn retriever(passages: &[&str]) -> Retriever {
        let store = SqliteStore::open_in_memory(Arc::new(MockProvider::new(64))).unwrap();
        let passages: Vec<String> = passages.iter().map(|p| p.to_string()).collect();
        store.ensure_table("context", &passages).await.unwrap();
        Retriever::new(Arc::new(store), "context")
    }

    #[tokio::test]
    async fn test_retrieve_single_passage() {
        let retriever = retriever(&["Monday to Friday 9am-6pm"]).await;

        let context = retriever.retrieve("Is it open on Tuesday?", 3).await.unwrap();
        assert_eq!(context, "Monday to Friday 9am-6pm");
    }

    #[tokio::test]
    async fn test_context_joins_with_separator() {
        let retriever = retriever(&[
            "Saturday hours are 10am to 2pm.",
            "Sunday the shop is closed.",
            "Parking is behind the building.",
        ])
        .await;

        let ranked = retriever.search("Saturday Sunday hours", 2).await.unwrap();
        assert_eq!(ranked.len(), 2);

        let context = retriever.retrieve("Saturday Sunday hours", 2).await.unwrap();
        assert_eq!(context.matches(CONTEXT_SEPARATOR).count(), 1);
        assert!(context.starts_with(&ranked[0].text));
        assert!(context.ends_with(&ranked[1].text));
    }

    #[tokio::test]
    async fn test_best_passage_first() {
        let retriever = retriever(&[
            "Parking is available behind the building.",
            "Saturday hours are 10am to 2pm.",
        ])
        .await;

        let ranked = retriever.search("Saturday hours", 2).await.unwrap();
        assert!(ranked[0].text.starts_with("Saturday"));
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[tokio::test]
    async fn test_custom_reranker_weight() {
        let retriever = retriever(&[
            "Parking is available behind the building.",
            "Saturday hours are 10am to 2pm.",
        ])
        .await
        .with_reranker(LinearCombinationReranker::new(0.0).unwrap());

        // Lexical only: the passage without a term match fuses to zero
        let ranked = retriever.search("Saturday hours", 2).await.unwrap();
        assert!(ranked[0].text.starts_with("Saturday"));
        assert_eq!(ranked[0].score, 1.0);
        assert_eq!(ranked[1].score, 0.0);
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let retriever = retriever(&["Monday to Friday 9am-6pm"]).await;

        assert!(matches!(
            retriever.search("   ", 3).await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            retriever.search("hours", 0).await,
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_table_is_retrieval_unavailable() {
        let store = SqliteStore::open_in_memory(Arc::new(MockProvider::new(64))).unwrap();
        let retriever = Retriever::new(Arc::new(store), "context");

        assert!(matches!(
            retriever.retrieve("hours", 3).await,
            Err(AppError::RetrievalUnavailable(_))
        ));
    }

    #[test]
    fn test_assemble_context_empty() {
        assert_eq!(assemble_context(&[]), "");
    }
}
