//! Parse model completions back into named task outputs.
//!
//! The primary format is the `[[ ## field ## ]]` section layout requested by
//! the builder. A completion that is a bare JSON object is accepted too,
//! since some models answer that way regardless of instructions.

use crate::builder::COMPLETED_MARKER;
use crate::types::{FieldKind, TaskOutputs, TaskSpec};
use ragcheck_core::{AppError, AppResult};
use serde_json::Value;
use std::collections::HashMap;

const MARKER_OPEN: &str = "[[ ## ";
const MARKER_CLOSE: &str = " ## ]]";

/// Split a completion into `(field name, section text)` pairs.
fn split_sections(completion: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current: Option<(String, usize)> = None;
    let mut cursor = 0;

    while let Some(offset) = completion[cursor..].find(MARKER_OPEN) {
        let start = cursor + offset;
        let name_start = start + MARKER_OPEN.len();
        let Some(close) = completion[name_start..].find(MARKER_CLOSE) else {
            break;
        };
        let name_end = name_start + close;
        let body_start = name_end + MARKER_CLOSE.len();

        if let Some((name, from)) = current.take() {
            sections
                .entry(name)
                .or_insert_with(|| completion[from..start].trim().to_string());
        }

        let name = completion[name_start..name_end].trim().to_string();
        if name == COMPLETED_MARKER {
            return sections;
        }
        current = Some((name, body_start));
        cursor = body_start;
    }

    if let Some((name, from)) = current {
        sections
            .entry(name)
            .or_insert_with(|| completion[from..].trim().to_string());
    }
    sections
}

fn typed_value(kind: FieldKind, raw: String) -> Value {
    match kind {
        FieldKind::Integer => match raw.trim().parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(raw),
        },
        FieldKind::Text => Value::String(raw),
    }
}

fn parse_json_object(task: &TaskSpec, completion: &str) -> Option<TaskOutputs> {
    let trimmed = completion
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) else {
        return None;
    };

    let mut outputs = TaskOutputs::new();
    for field in task.outputs() {
        if let Some(value) = map.get(&field.name) {
            let value = match value {
                Value::String(s) => typed_value(field.kind, s.clone()),
                other => other.clone(),
            };
            outputs.insert(field.name.clone(), value);
        }
    }
    Some(outputs)
}

/// Parse a completion for `task` into its output fields.
///
/// Every output field (rationale included) must be present. Integer fields
/// that parse cleanly become JSON numbers; anything else is kept as text so
/// callers can normalize it.
pub fn parse_completion(task: &TaskSpec, completion: &str) -> AppResult<TaskOutputs> {
    let outputs = if completion.contains(MARKER_OPEN) {
        let mut sections = split_sections(completion);
        let mut outputs = TaskOutputs::new();
        for field in task.outputs() {
            if let Some(raw) = sections.remove(&field.name) {
                outputs.insert(field.name.clone(), typed_value(field.kind, raw));
            }
        }
        outputs
    } else if let Some(outputs) = parse_json_object(task, completion) {
        tracing::debug!("Parsed completion for task {} as JSON", task.id);
        outputs
    } else {
        return Err(AppError::GenerationFailed(format!(
            "completion for task `{}` has no structured output fields",
            task.id
        )));
    };

    for field in task.outputs() {
        outputs.require(&field.name)?;
    }

    Ok(outputs)
}
