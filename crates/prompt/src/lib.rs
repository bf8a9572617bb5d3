//! Structured task prompting for ragcheck.
//!
//! This crate provides:
//! - Task specifications as plain data, with YAML overrides
//! - Handlebars rendering of `[[ ## field ## ]]` prompts
//! - Parsing of completions back into named outputs
//! - A chain-of-thought predictor over an injected LLM client

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod parser;
pub mod predict;
pub mod types;

pub use builder::build_prompt;
pub use builtin::{answer_task, evaluate_task, ANSWER_TASK_ID, EVALUATE_TASK_ID};
pub use loader::{list_tasks, load_task, validate_task};
pub use parser::parse_completion;
pub use predict::ChainOfThought;
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, FieldKind, FieldRole, FieldSpec, TaskOutputs, TaskSpec,
};
