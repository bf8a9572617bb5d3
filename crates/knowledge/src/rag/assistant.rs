//! Retrieve, answer, grade.

use crate::rag::evaluator::AnswerEvaluator;
use crate::rag::generator::AnswerGenerator;
use crate::rag::types::AssistantResponse;
use crate::retriever::{Retriever, DEFAULT_TOP_K};
use ragcheck_core::{AppError, AppResult};

/// Runs one query through retrieval, generation and evaluation.
///
/// Each stage runs exactly once. The first failing stage aborts the call
/// and its error is returned unchanged.
#[derive(Clone)]
pub struct Assistant {
    retriever: Retriever,
    generator: AnswerGenerator,
    evaluator: AnswerEvaluator,
    top_k: usize,
}

impl Assistant {
    pub fn new(retriever: Retriever, generator: AnswerGenerator, evaluator: AnswerEvaluator) -> Self {
        Self {
            retriever,
            generator,
            evaluator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> AppResult<Self> {
        if top_k == 0 {
            return Err(AppError::InvalidArgument("top_k must be at least 1".to_string()));
        }
        self.top_k = top_k;
        Ok(self)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub async fn process(&self, query: &str) -> AppResult<AssistantResponse> {
        tracing::info!("Retrieving context from '{}'", self.retriever.table());
        let context = self.retriever.retrieve(query, self.top_k).await?;

        tracing::info!("Generating answer");
        let prediction = self.generator.generate(query, &context).await?;

        tracing::info!("Evaluating answer");
        let evaluation = self
            .evaluator
            .evaluate(
                &prediction.query,
                &prediction.context,
                &prediction.answer,
                &prediction.rationale,
            )
            .await?;

        tracing::info!(accuracy = %evaluation.accuracy_metric, "Query processed");
        Ok(evaluation.into())
    }
}
