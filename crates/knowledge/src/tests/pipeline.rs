//! End-to-end pipeline tests over a temporary workspace.

use crate::embeddings::EmbeddingConfig;
use crate::rag::AccuracyMetric;
use crate::retriever::CONTEXT_SEPARATOR;
use crate::types::{IngestOptions, StoreBackend};
use crate::{assistant, config, ingest, retriever, stats};
use ragcheck_core::AppError;
use ragcheck_llm::ScriptedClient;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const HOURS: &str = "Monday to Friday 9am-6pm";

fn answer_completion(rationale: &str, answer: &str) -> String {
    format!(
        "[[ ## answer_rationale ## ]]\n{}\n\n[[ ## answer ## ]]\n{}\n\n[[ ## completed ## ]]",
        rationale, answer
    )
}

fn evaluate_completion(rationale: &str, metric: &str) -> String {
    format!(
        "[[ ## rationale_metric ## ]]\n{}\n\n[[ ## accuracy_metric ## ]]\n{}\n\n[[ ## completed ## ]]",
        rationale, metric
    )
}

async fn ingest_text(workspace: &TempDir, text: &str) {
    ingest(workspace.path(), IngestOptions::new("context", text))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_open_on_tuesday() {
    let workspace = TempDir::new().unwrap();
    ingest_text(&workspace, HOURS).await;

    let client = Arc::new(ScriptedClient::new([
        answer_completion(
            "The context says the hours are Monday to Friday, and Tuesday is in that range.",
            "Yes, it is open on Tuesday from 9am to 6pm.",
        ),
        evaluate_completion("The answer restates the context exactly.", "10"),
    ]));

    let assistant = assistant(workspace.path(), "context", client.clone(), "test-model", None)
        .await
        .unwrap();
    let response = assistant.process("Is it open on Tuesday?").await.unwrap();

    assert_eq!(response.query, "Is it open on Tuesday?");
    assert_eq!(response.context, HOURS);
    assert_eq!(response.answer, "Yes, it is open on Tuesday from 9am to 6pm.");
    assert!(response.answer_rationale.contains("Tuesday"));
    assert_eq!(response.accuracy_metric, AccuracyMetric::Score(10));

    // The evaluator sees the generator's answer and rationale
    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].prompt.contains("Yes, it is open on Tuesday from 9am to 6pm."));
    assert!(requests[1].prompt.contains("Tuesday is in that range"));
    assert!(requests[1].prompt.contains(HOURS));
}

#[tokio::test]
async fn test_missing_information_is_declined_and_scored() {
    let workspace = TempDir::new().unwrap();
    ingest_text(&workspace, "Parking is available behind the building.").await;

    let client = Arc::new(ScriptedClient::new([
        answer_completion(
            "The context only mentions parking, nothing about pets.",
            "Sorry, I cannot tell whether pets are allowed from the available information.",
        ),
        evaluate_completion("Declining is correct given the context.", "Score: 9 out of 10"),
    ]));

    let assistant = assistant(workspace.path(), "context", client, "m", None)
        .await
        .unwrap();
    let response = assistant.process("Are pets allowed?").await.unwrap();

    assert!(response.answer.starts_with("Sorry"));
    assert_eq!(response.accuracy_metric, AccuracyMetric::Score(9));
}

#[tokio::test]
async fn test_unparsed_metric_surfaces_raw_value() {
    let workspace = TempDir::new().unwrap();
    ingest_text(&workspace, HOURS).await;

    let client = Arc::new(ScriptedClient::new([
        answer_completion("In range.", "Yes, open Tuesday 9am to 6pm."),
        evaluate_completion("Hard to say.", "no digits here"),
    ]));

    let response = assistant(workspace.path(), "context", client, "m", None)
        .await
        .unwrap()
        .process("Is it open on Tuesday?")
        .await
        .unwrap();

    assert_eq!(
        response.accuracy_metric,
        AccuracyMetric::Unparsed("no digits here".to_string())
    );

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["accuracy_metric"], "no digits here");
}

#[tokio::test]
async fn test_evaluation_failure_returns_no_partial_result() {
    let workspace = TempDir::new().unwrap();
    ingest_text(&workspace, HOURS).await;

    let client = Arc::new(ScriptedClient::new([answer_completion(
        "In range.",
        "Yes, open Tuesday.",
    )]));
    client.push_failure("model overloaded");

    let err = assistant(workspace.path(), "context", client, "m", None)
        .await
        .unwrap()
        .process("Is it open on Tuesday?")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::GenerationFailed(_)));
}

#[tokio::test]
async fn test_retrieval_failure_skips_generation() {
    let workspace = TempDir::new().unwrap();
    let client = Arc::new(ScriptedClient::new(["unused", "unused"]));

    let err = assistant(workspace.path(), "context", client.clone(), "m", None)
        .await
        .unwrap()
        .process("Is it open on Tuesday?")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::RetrievalUnavailable(_)));
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_top_k_larger_than_table() {
    let workspace = TempDir::new().unwrap();
    ingest_text(&workspace, HOURS).await;

    let retriever = retriever(workspace.path(), "context").await.unwrap();
    let context = retriever.retrieve("Is it open on Tuesday?", 3).await.unwrap();

    assert_eq!(context, HOURS);
    assert!(!context.contains(CONTEXT_SEPARATOR));
}

#[tokio::test]
async fn test_context_holds_top_k_blocks() {
    let workspace = TempDir::new().unwrap();
    let text = "Monday to Friday 9am-6pm. Saturday 10am-2pm. Sunday closed. \
                Parking behind the building. Deliveries arrive on Wednesday mornings.";
    ingest(
        workspace.path(),
        IngestOptions {
            chunk_size: Some(4),
            ..IngestOptions::new("context", text)
        },
    )
    .await
    .unwrap();

    let retriever = retriever(workspace.path(), "context").await.unwrap();
    let context = retriever.retrieve("When is it open on Saturday?", 3).await.unwrap();
    assert_eq!(context.split(CONTEXT_SEPARATOR).count(), 3);
}

#[tokio::test]
async fn test_retrieval_is_deterministic() {
    let workspace = TempDir::new().unwrap();
    let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu";
    ingest(
        workspace.path(),
        IngestOptions {
            chunk_size: Some(2),
            ..IngestOptions::new("context", text)
        },
    )
    .await
    .unwrap();

    let retriever = retriever(workspace.path(), "context").await.unwrap();
    let first = retriever.search("beta delta", 4).await.unwrap();
    for _ in 0..3 {
        assert_eq!(retriever.search("beta delta", 4).await.unwrap(), first);
    }
}

#[tokio::test]
async fn test_ingest_is_idempotent() {
    let workspace = TempDir::new().unwrap();

    let first = ingest(workspace.path(), IngestOptions::new("context", HOURS))
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.rows, 1);

    let second = ingest(
        workspace.path(),
        IngestOptions::new("context", "completely different text with more words"),
    )
    .await
    .unwrap();
    assert!(!second.created);
    assert_eq!(second.rows, 1);

    assert_eq!(stats(workspace.path(), "context").await.unwrap().rows, 1);
}

#[tokio::test]
async fn test_reset_rebuilds_table() {
    let workspace = TempDir::new().unwrap();
    ingest_text(&workspace, HOURS).await;

    let rebuilt = ingest(
        workspace.path(),
        IngestOptions {
            chunk_size: Some(2),
            reset: true,
            ..IngestOptions::new("context", HOURS)
        },
    )
    .await
    .unwrap();

    assert!(rebuilt.created);
    assert_eq!(rebuilt.rows, 2);
    assert_eq!(config::load_config(workspace.path(), "context").unwrap().chunk_size, 2);
}

#[tokio::test]
async fn test_embedding_change_requires_reset() {
    let workspace = TempDir::new().unwrap();
    ingest_text(&workspace, HOURS).await;

    let err = ingest(
        workspace.path(),
        IngestOptions {
            embedding: Some(EmbeddingConfig {
                dimensions: 128,
                ..EmbeddingConfig::default()
            }),
            ..IngestOptions::new("context", HOURS)
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));

    let err = ingest(
        workspace.path(),
        IngestOptions {
            backend: Some(StoreBackend::LanceDb),
            ..IngestOptions::new("context", HOURS)
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}

#[tokio::test]
async fn test_stats() {
    let workspace = TempDir::new().unwrap();

    let before = stats(workspace.path(), "context").await.unwrap();
    assert!(!before.exists);
    assert_eq!(before.rows, 0);
    assert!(before.last_ingested_at.is_none());

    ingest_text(&workspace, "one two three four five six").await;

    let after = stats(workspace.path(), "context").await.unwrap();
    assert!(after.exists);
    assert_eq!(after.rows, 1);
    assert_eq!(after.backend, StoreBackend::Sqlite);
    assert_eq!(after.embedding.provider, "mock");
    assert!(after.last_ingested_at.is_some());
}

#[tokio::test]
async fn test_task_override_changes_prompt() {
    let workspace = TempDir::new().unwrap();
    ingest_text(&workspace, HOURS).await;

    let tasks = workspace.path().join(".ragcheck").join("tasks");
    fs::create_dir_all(&tasks).unwrap();
    fs::write(
        tasks.join("answer.yml"),
        r#"
id: answer
instructions: Answer in the voice of a ship's captain.
fields:
  - { name: query, role: input }
  - { name: context_chunks, role: input }
  - { name: answer_rationale, role: rationale }
  - { name: answer, role: output }
"#,
    )
    .unwrap();

    let client = Arc::new(ScriptedClient::new([
        answer_completion("Aye, in range.", "Aye, open Tuesday from 9am to 6pm."),
        evaluate_completion("Matches.", "8"),
    ]));

    let response = assistant(workspace.path(), "context", client.clone(), "m", Some(1))
        .await
        .unwrap()
        .process("Is it open on Tuesday?")
        .await
        .unwrap();

    assert_eq!(response.accuracy_metric, AccuracyMetric::Score(8));
    let system = client.requests()[0].system.clone().unwrap();
    assert!(system.contains("ship's captain"));
}

#[tokio::test]
async fn test_reranker_weight_from_table_config() {
    let workspace = TempDir::new().unwrap();
    ingest_text(
        &workspace,
        "Saturday hours are 10am to 2pm. Parking is available behind the building.",
    )
    .await;

    let mut table = config::load_config(workspace.path(), "context").unwrap();
    assert_eq!(table.reranker_weight, 0.7);

    table.reranker_weight = 0.0;
    config::save_config(workspace.path(), &table).unwrap();
    let ranked = retriever(workspace.path(), "context")
        .await
        .unwrap()
        .search("Saturday hours", 3)
        .await
        .unwrap();
    assert_eq!(ranked[0].score, 1.0);

    table.reranker_weight = 1.5;
    config::save_config(workspace.path(), &table).unwrap();
    let err = retriever(workspace.path(), "context").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));
}
