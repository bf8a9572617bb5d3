//! Prompt builder for rendering task specifications.
//!
//! Fields are laid out with `[[ ## name ## ]]` section markers. The system
//! message describes the layout and the objective; the user message carries
//! the input values and asks for the outputs, rationale first.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, FieldKind, FieldSpec, TaskSpec};
use handlebars::Handlebars;
use ragcheck_core::{AppError, AppResult};
use serde_json::json;
use std::collections::HashMap;

/// Marker closing a completion.
pub const COMPLETED_MARKER: &str = "completed";

const SYSTEM_TEMPLATE: &str = "Your input fields are:
{{#each inputs}}
- `{{name}}`: {{description}}
{{/each}}
Your output fields are:
{{#each outputs}}
- `{{name}}`{{#if hint}} ({{hint}}){{/if}}: {{description}}
{{/each}}

All interactions will be structured in the following way, with the appropriate values filled in.

{{#each inputs}}
[[ ## {{name}} ## ]]
{ {{name}} }

{{/each}}
{{#each outputs}}
[[ ## {{name}} ## ]]
{ {{name}} }

{{/each}}
[[ ## completed ## ]]

In adhering to this structure, your objective is:
{{instructions}}";

const USER_TEMPLATE: &str = "{{#each inputs}}
[[ ## {{name}} ## ]]
{{value}}

{{/each}}
Respond with the corresponding output fields, starting with the field {{order}}, and then ending with the marker for `[[ ## completed ## ]]`.";

/// Format a section marker for a field name.
pub fn marker(name: &str) -> String {
    format!("[[ ## {} ## ]]", name)
}

fn kind_hint(field: &FieldSpec) -> Option<&'static str> {
    match field.kind {
        FieldKind::Integer => Some("must be formatted as a valid integer"),
        FieldKind::Text => None,
    }
}

/// Build a prompt from a task specification and input values.
///
/// Every input field of the task must have a value in `inputs`; extra
/// entries are ignored.
///
/// # Example
/// ```no_run
/// use ragcheck_prompt::{build_prompt, builtin::answer_task};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut inputs = HashMap::new();
/// inputs.insert("query".to_string(), "Is it open on Tuesday?".to_string());
/// inputs.insert("context_chunks".to_string(), "Monday to Friday 9am-6pm".to_string());
///
/// let built = build_prompt(&answer_task(), &inputs)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(task: &TaskSpec, inputs: &HashMap<String, String>) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt for task: {}", task.id);

    let mut resolved = HashMap::new();
    let mut input_views = Vec::new();
    for field in task.inputs() {
        let value = inputs.get(&field.name).ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "task `{}` requires input `{}`",
                task.id, field.name
            ))
        })?;
        resolved.insert(field.name.clone(), value.clone());
        input_views.push(json!({
            "name": field.name,
            "description": field.description,
            "value": value,
        }));
    }

    let outputs = task.outputs();
    let output_views: Vec<_> = outputs
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "description": f.description,
                "hint": kind_hint(f),
            })
        })
        .collect();

    let order = outputs
        .iter()
        .map(|f| match kind_hint(f) {
            Some(hint) => format!("`{}` ({})", marker(&f.name), hint),
            None => format!("`{}`", marker(&f.name)),
        })
        .collect::<Vec<_>>()
        .join(", then ");

    let data = json!({
        "inputs": input_views,
        "outputs": output_views,
        "instructions": task.instructions.trim(),
        "order": order,
    });

    let system = render_template(SYSTEM_TEMPLATE, &data)?;
    let user = render_template(USER_TEMPLATE, &data)?;

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_task_id: task.id.clone(),
            requested_outputs: outputs.iter().map(|f| f.name.clone()).collect(),
            resolved_inputs: resolved,
        },
    })
}

/// Render a Handlebars template with the given data.
fn render_template(template: &str, data: &serde_json::Value) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
