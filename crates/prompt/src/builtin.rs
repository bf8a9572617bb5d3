//! Built-in task specifications for the question-answering pipeline.

use crate::types::{FieldSpec, TaskSpec};

/// Identifier of the answer-generation task.
pub const ANSWER_TASK_ID: &str = "answer";

/// Identifier of the answer-grading task.
pub const EVALUATE_TASK_ID: &str = "evaluate";

/// Produce a short answer grounded in the retrieved context.
pub fn answer_task() -> TaskSpec {
    TaskSpec {
        id: ANSWER_TASK_ID.to_string(),
        api_version: "1.0".to_string(),
        instructions: "Answer the user's question using only the provided context chunks. \
            Keep the answer between 5 and 20 words. If the context is empty or does not \
            contain the information needed, politely say you cannot answer from the \
            available information instead of guessing."
            .to_string(),
        fields: vec![
            FieldSpec::input("query", "The user's question"),
            FieldSpec::input(
                "context_chunks",
                "Passages retrieved from the knowledge base, separated by context block markers",
            ),
            FieldSpec::rationale(
                "answer_rationale",
                "Step-by-step reasoning linking the context to the answer",
            ),
            FieldSpec::output("answer", "A concise answer of 5 to 20 words"),
        ],
    }
}

/// Grade an answer for faithfulness to the same context.
pub fn evaluate_task() -> TaskSpec {
    TaskSpec {
        id: EVALUATE_TASK_ID.to_string(),
        api_version: "1.0".to_string(),
        instructions: "Assess whether the answer is accurate and fully supported by the \
            context chunks. Score 10 when the answer is directly supported, 0 when it \
            contradicts or invents facts. A polite refusal is correct when the context \
            lacks the needed information and should receive a high score."
            .to_string(),
        fields: vec![
            FieldSpec::input("query", "The user's question"),
            FieldSpec::input("context_chunks", "Passages the answer was generated from"),
            FieldSpec::input("answer", "The answer under evaluation"),
            FieldSpec::input("answer_rationale", "Reasoning given for the answer"),
            FieldSpec::rationale(
                "rationale_metric",
                "Reasoning behind the accuracy score",
            ),
            FieldSpec::output(
                "accuracy_metric",
                "Accuracy of the answer as an integer from 0 to 10",
            )
            .integer(),
        ],
    }
}

/// Look up a built-in task by id.
pub fn builtin_task(id: &str) -> Option<TaskSpec> {
    match id {
        ANSWER_TASK_ID => Some(answer_task()),
        EVALUATE_TASK_ID => Some(evaluate_task()),
        _ => None,
    }
}

/// Ids of all built-in tasks.
pub fn builtin_task_ids() -> [&'static str; 2] {
    [ANSWER_TASK_ID, EVALUATE_TASK_ID]
}
