//! Answer generation over retrieved context.

use crate::rag::types::Prediction;
use ragcheck_core::{AppError, AppResult};
use ragcheck_llm::LlmClient;
use ragcheck_prompt::{answer_task, ChainOfThought, TaskSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Produces a short answer and its rationale from a query and context.
#[derive(Clone)]
pub struct AnswerGenerator {
    predictor: ChainOfThought,
}

impl AnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self::with_task(client, model, answer_task())
    }

    /// Use a custom task specification, e.g. a workspace override.
    pub fn with_task(client: Arc<dyn LlmClient>, model: impl Into<String>, task: TaskSpec) -> Self {
        Self {
            predictor: ChainOfThought::new(client, model, task),
        }
    }

    /// Answer `query` from `context`.
    ///
    /// An empty context is allowed; the task asks the model to decline.
    pub async fn generate(&self, query: &str, context: &str) -> AppResult<Prediction> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidArgument("query must not be empty".to_string()));
        }

        let mut inputs = HashMap::new();
        inputs.insert("query".to_string(), query.to_string());
        inputs.insert("context_chunks".to_string(), context.to_string());

        let outputs = self.predictor.call(&inputs).await?;
        let prediction = Prediction {
            query: query.to_string(),
            context: context.to_string(),
            answer: outputs.text("answer")?,
            rationale: outputs.text("answer_rationale")?,
        };

        tracing::debug!(answer = %prediction.answer, "Generated answer");
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcheck_llm::ScriptedClient;

    #[tokio::test]
    async fn test_generate() {
        let client = Arc::new(ScriptedClient::new([
            "[[ ## answer_rationale ## ]]\nTuesday is between Monday and Friday.\n\n[[ ## answer ## ]]\nYes, it is open on Tuesday from 9am to 6pm.\n\n[[ ## completed ## ]]",
        ]));
        let generator = AnswerGenerator::new(client.clone(), "test-model");

        let prediction = generator
            .generate("Is it open on Tuesday?", "Monday to Friday 9am-6pm")
            .await
            .unwrap();

        assert_eq!(prediction.answer, "Yes, it is open on Tuesday from 9am to 6pm.");
        assert_eq!(prediction.rationale, "Tuesday is between Monday and Friday.");
        assert_eq!(prediction.context, "Monday to Friday 9am-6pm");

        let requests = client.requests();
        assert!(requests[0].prompt.contains("Monday to Friday 9am-6pm"));
    }

    #[tokio::test]
    async fn test_empty_context_allowed() {
        let client = Arc::new(ScriptedClient::new([
            "[[ ## answer_rationale ## ]]\nNo context.\n[[ ## answer ## ]]\nSorry, I cannot answer that from the available information.\n[[ ## completed ## ]]",
        ]));
        let generator = AnswerGenerator::new(client, "m");

        let prediction = generator.generate("Is it open on Tuesday?", "").await.unwrap();
        assert!(prediction.answer.starts_with("Sorry"));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let client = Arc::new(ScriptedClient::new(["unused"]));
        let generator = AnswerGenerator::new(client.clone(), "m");

        let err = generator.generate(" ", "context").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
        assert_eq!(client.remaining(), 1);
    }

    #[tokio::test]
    async fn test_malformed_output_is_generation_failed() {
        let client = Arc::new(ScriptedClient::new(["I think the answer is yes."]));
        let generator = AnswerGenerator::new(client, "m");

        let err = generator.generate("q", "c").await.unwrap_err();
        assert!(matches!(err, AppError::GenerationFailed(_)));
    }
}
