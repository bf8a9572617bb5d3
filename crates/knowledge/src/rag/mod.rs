//! Retrieval-augmented question answering.
//!
//! The [`Assistant`] retrieves context, asks an [`AnswerGenerator`] for a
//! grounded answer, then has an [`AnswerEvaluator`] grade that answer
//! against the same context.

pub mod assistant;
pub mod evaluator;
pub mod generator;
pub mod types;

pub use assistant::Assistant;
pub use evaluator::AnswerEvaluator;
pub use generator::AnswerGenerator;
pub use types::{AccuracyMetric, AssistantResponse, Evaluation, Prediction};
