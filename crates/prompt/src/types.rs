//! Task specification types.
//!
//! A task specification is plain data: an identifier, free-text
//! instructions and an ordered list of named fields. It drives both the
//! prompt that is rendered for the model and the parsing of its reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use ragcheck_core::{AppError, AppResult};

fn default_api_version() -> String {
    "1.0".to_string()
}

/// A structured task the language model is asked to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique task identifier (e.g. "answer", "evaluate")
    pub id: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,

    /// Objective given to the model
    pub instructions: String,

    /// Ordered field list
    pub fields: Vec<FieldSpec>,
}

/// One named field of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub role: FieldRole,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: FieldKind,
}

/// Whether a field is supplied by the caller or produced by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    Input,
    Output,
    /// Output holding the model's reasoning; requested before other outputs.
    Rationale,
}

/// Semantic type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Integer,
}

impl FieldSpec {
    pub fn input(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FieldRole::Input,
            description: description.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn output(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FieldRole::Output,
            description: description.into(),
            kind: FieldKind::Text,
        }
    }

    pub fn rationale(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: FieldRole::Rationale,
            description: description.into(),
            kind: FieldKind::Text,
        }
    }

    /// Mark the field as integer-valued.
    pub fn integer(mut self) -> Self {
        self.kind = FieldKind::Integer;
        self
    }

    pub fn is_input(&self) -> bool {
        self.role == FieldRole::Input
    }
}

impl TaskSpec {
    /// Input fields in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_input())
    }

    /// Output fields in the order the model must emit them: the rationale
    /// first, then the remaining outputs in declaration order.
    pub fn outputs(&self) -> Vec<&FieldSpec> {
        let rationale = self.fields.iter().filter(|f| f.role == FieldRole::Rationale);
        let outputs = self.fields.iter().filter(|f| f.role == FieldRole::Output);
        rationale.chain(outputs).collect()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message describing the field layout and objective
    pub system: String,

    /// User message carrying the input values
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source task ID
    #[serde(rename = "sourceTaskId")]
    pub source_task_id: String,

    /// Output fields requested, in emission order
    #[serde(rename = "requestedOutputs")]
    pub requested_outputs: Vec<String>,

    /// Input values that were rendered
    #[serde(rename = "resolvedInputs")]
    pub resolved_inputs: HashMap<String, String>,
}

/// Named outputs parsed from a model completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskOutputs {
    values: BTreeMap<String, Value>,
}

impl TaskOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Value of a field that must be present.
    pub fn require(&self, name: &str) -> AppResult<&Value> {
        self.values.get(name).ok_or_else(|| {
            AppError::GenerationFailed(format!("missing output field `{}`", name))
        })
    }

    /// Field rendered as text; numbers are formatted, strings returned as-is.
    pub fn text(&self, name: &str) -> AppResult<String> {
        Ok(match self.require(name)? {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_spec_deserialization() {
        let yaml = r#"
id: answer
instructions: Answer the question.
fields:
  - name: query
    role: input
    description: the question
  - name: answer
    role: output
  - name: reasoning
    role: rationale
  - name: score
    role: output
    kind: integer
"#;

        let task: TaskSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(task.id, "answer");
        assert_eq!(task.api_version, "1.0");
        assert_eq!(task.inputs().count(), 1);
        assert_eq!(task.field("score").unwrap().kind, FieldKind::Integer);
        assert_eq!(task.field("answer").unwrap().description, "");
    }

    #[test]
    fn test_outputs_put_rationale_first() {
        let task = TaskSpec {
            id: "t".to_string(),
            api_version: default_api_version(),
            instructions: String::new(),
            fields: vec![
                FieldSpec::input("q", ""),
                FieldSpec::output("a", ""),
                FieldSpec::output("b", ""),
                FieldSpec::rationale("why", ""),
            ],
        };

        let names: Vec<&str> = task.outputs().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["why", "a", "b"]);
    }

    #[test]
    fn test_task_outputs_access() {
        let mut outputs = TaskOutputs::new();
        outputs.insert("answer", Value::String("Yes.".to_string()));
        outputs.insert("score", Value::from(9));

        assert_eq!(outputs.text("answer").unwrap(), "Yes.");
        assert_eq!(outputs.text("score").unwrap(), "9");
        assert!(matches!(
            outputs.require("missing"),
            Err(AppError::GenerationFailed(_))
        ));
    }
}
