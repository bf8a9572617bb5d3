//! Faithfulness grading of a generated answer.

use crate::rag::types::{AccuracyMetric, Evaluation};
use ragcheck_core::AppResult;
use ragcheck_llm::LlmClient;
use ragcheck_prompt::{evaluate_task, ChainOfThought, TaskSpec};
use std::collections::HashMap;
use std::sync::Arc;

/// Scores how well an answer is supported by its context, on a 0-10 scale.
#[derive(Clone)]
pub struct AnswerEvaluator {
    predictor: ChainOfThought,
}

impl AnswerEvaluator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self::with_task(client, model, evaluate_task())
    }

    pub fn with_task(client: Arc<dyn LlmClient>, model: impl Into<String>, task: TaskSpec) -> Self {
        Self {
            predictor: ChainOfThought::new(client, model, task),
        }
    }

    pub async fn evaluate(
        &self,
        query: &str,
        context: &str,
        answer: &str,
        rationale: &str,
    ) -> AppResult<Evaluation> {
        let inputs: HashMap<String, String> = [
            ("query", query),
            ("context_chunks", context),
            ("answer", answer),
            ("answer_rationale", rationale),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let outputs = self.predictor.call(&inputs).await?;
        let accuracy_metric = AccuracyMetric::from_value(outputs.require("accuracy_metric")?);

        tracing::debug!(accuracy = %accuracy_metric, "Evaluated answer");

        Ok(Evaluation {
            query: query.to_string(),
            context: context.to_string(),
            answer: answer.to_string(),
            rationale: rationale.to_string(),
            accuracy_metric,
            rationale_metric: outputs.text("rationale_metric")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcheck_core::AppError;
    use ragcheck_llm::ScriptedClient;

    fn evaluator(completion: &str) -> AnswerEvaluator {
        AnswerEvaluator::new(Arc::new(ScriptedClient::new([completion.to_string()])), "m")
    }

    async fn run(evaluator: &AnswerEvaluator) -> AppResult<Evaluation> {
        evaluator
            .evaluate(
                "Is it open on Tuesday?",
                "Monday to Friday 9am-6pm",
                "Yes, it is open on Tuesday from 9am to 6pm.",
                "Tuesday falls between Monday and Friday.",
            )
            .await
    }

    #[tokio::test]
    async fn test_integer_metric() {
        let evaluation = run(&evaluator(
            "[[ ## rationale_metric ## ]]\nFully supported.\n[[ ## accuracy_metric ## ]]\n10\n[[ ## completed ## ]]",
        ))
        .await
        .unwrap();

        assert_eq!(evaluation.accuracy_metric, AccuracyMetric::Score(10));
        assert_eq!(evaluation.rationale_metric, "Fully supported.");
        assert_eq!(evaluation.answer, "Yes, it is open on Tuesday from 9am to 6pm.");
    }

    #[tokio::test]
    async fn test_embedded_metric() {
        let evaluation = run(&evaluator(
            "[[ ## rationale_metric ## ]]\nMostly.\n[[ ## accuracy_metric ## ]]\nScore: 9 out of 10\n[[ ## completed ## ]]",
        ))
        .await
        .unwrap();

        assert_eq!(evaluation.accuracy_metric, AccuracyMetric::Score(9));
    }

    #[tokio::test]
    async fn test_unparsed_metric_passes_through() {
        let evaluation = run(&evaluator(
            "[[ ## rationale_metric ## ]]\nUnsure.\n[[ ## accuracy_metric ## ]]\nno digits here\n[[ ## completed ## ]]",
        ))
        .await
        .unwrap();

        assert_eq!(
            evaluation.accuracy_metric,
            AccuracyMetric::Unparsed("no digits here".to_string())
        );
    }

    #[tokio::test]
    async fn test_json_completion() {
        let evaluation = run(&evaluator(
            r#"{"rationale_metric": "Supported.", "accuracy_metric": 8}"#,
        ))
        .await
        .unwrap();

        assert_eq!(evaluation.accuracy_metric, AccuracyMetric::Score(8));
    }

    #[tokio::test]
    async fn test_missing_metric_is_generation_failed() {
        let err = run(&evaluator(
            "[[ ## rationale_metric ## ]]\nSupported.\n[[ ## completed ## ]]",
        ))
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::GenerationFailed(_)));
    }
}
