//! Task loader: built-in task specifications with YAML overrides.

use crate::builtin::{builtin_task, builtin_task_ids};
use crate::types::{FieldRole, TaskSpec};
use ragcheck_core::config::STATE_DIR;
use ragcheck_core::{AppError, AppResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn tasks_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("tasks")
}

/// Load a task specification by ID.
///
/// A file named `<id>.yml` in `.ragcheck/tasks/` takes precedence over the
/// built-in task of the same id.
///
/// # Example
/// ```no_run
/// use ragcheck_prompt::load_task;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let task = load_task(Path::new("."), "answer")?;
/// println!("Loaded task: {}", task.id);
/// # Ok(())
/// # }
/// ```
pub fn load_task(workspace_path: &Path, task_id: &str) -> AppResult<TaskSpec> {
    let task_file = tasks_dir(workspace_path).join(format!("{}.yml", task_id));

    if !task_file.exists() {
        return builtin_task(task_id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown task: {}", task_id)));
    }

    tracing::debug!("Loading task override from: {:?}", task_file);

    let contents = std::fs::read_to_string(&task_file).map_err(|e| {
        AppError::Prompt(format!("Failed to read task file {:?}: {}", task_file, e))
    })?;

    let task: TaskSpec = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse task YAML {:?}: {}", task_file, e))
    })?;

    if task.id != task_id {
        return Err(AppError::Prompt(format!(
            "Task file {:?} declares id `{}`, expected `{}`",
            task_file, task.id, task_id
        )));
    }

    validate_task(&task)?;

    tracing::info!("Loaded task override: {}", task.id);

    Ok(task)
}

/// List all available task IDs: built-ins plus workspace overrides.
pub fn list_tasks(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut task_ids: Vec<String> = builtin_task_ids().iter().map(|s| s.to_string()).collect();

    let dir = tasks_dir(workspace_path);
    if dir.exists() {
        for entry in walkdir::WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    task_ids.push(stem.to_string());
                }
            }
        }
    }

    task_ids.sort();
    task_ids.dedup();
    Ok(task_ids)
}

/// Validate a task specification.
pub fn validate_task(task: &TaskSpec) -> AppResult<()> {
    if task.id.trim().is_empty() {
        return Err(AppError::Prompt("Task ID cannot be empty".to_string()));
    }

    if !task.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            task.api_version
        )));
    }

    let mut seen = HashSet::new();
    for field in &task.fields {
        if field.name.trim().is_empty() {
            return Err(AppError::Prompt(format!(
                "Task `{}` has a field with an empty name",
                task.id
            )));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(AppError::Prompt(format!(
                "Task `{}` declares field `{}` twice",
                task.id, field.name
            )));
        }
    }

    let count = |role: FieldRole| task.fields.iter().filter(|f| f.role == role).count();

    if count(FieldRole::Input) == 0 {
        return Err(AppError::Prompt(format!(
            "Task `{}` needs at least one input field",
            task.id
        )));
    }
    if count(FieldRole::Output) == 0 {
        return Err(AppError::Prompt(format!(
            "Task `{}` needs at least one output field",
            task.id
        )));
    }
    if count(FieldRole::Rationale) > 1 {
        return Err(AppError::Prompt(format!(
            "Task `{}` declares more than one rationale field",
            task.id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_task(dir: &Path, id: &str, content: &str) {
        let tasks = tasks_dir(dir);
        fs::create_dir_all(&tasks).unwrap();
        fs::write(tasks.join(format!("{}.yml", id)), content).unwrap();
    }

    #[test]
    fn test_load_builtin_task() {
        let temp_dir = TempDir::new().unwrap();
        let task = load_task(temp_dir.path(), "answer").unwrap();
        assert_eq!(task.id, "answer");
    }

    #[test]
    fn test_override_takes_precedence() {
        let temp_dir = TempDir::new().unwrap();
        write_task(
            temp_dir.path(),
            "answer",
            r#"
id: answer
instructions: Answer like a pirate.
fields:
  - { name: query, role: input }
  - { name: context_chunks, role: input }
  - { name: answer_rationale, role: rationale }
  - { name: answer, role: output }
"#,
        );

        let task = load_task(temp_dir.path(), "answer").unwrap();
        assert_eq!(task.instructions, "Answer like a pirate.");
    }

    #[test]
    fn test_load_unknown_task() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_task(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_task(temp_dir.path(), "broken", "invalid: yaml: content:");
        assert!(load_task(temp_dir.path(), "broken").is_err());
    }

    #[test]
    fn test_mismatched_id_rejected() {
        let temp_dir = TempDir::new().unwrap();
        write_task(
            temp_dir.path(),
            "evaluate",
            "id: other\ninstructions: x\nfields:\n  - { name: a, role: input }\n  - { name: b, role: output }\n",
        );
        assert!(load_task(temp_dir.path(), "evaluate").is_err());
    }

    #[test]
    fn test_list_tasks() {
        let temp_dir = TempDir::new().unwrap();
        write_task(
            temp_dir.path(),
            "summarize",
            "id: summarize\ninstructions: x\nfields:\n  - { name: a, role: input }\n  - { name: b, role: output }\n",
        );

        let tasks = list_tasks(temp_dir.path()).unwrap();
        assert_eq!(tasks, vec!["answer", "evaluate", "summarize"]);
    }

    #[test]
    fn test_validate_rejects_duplicate_fields() {
        let mut task = crate::builtin::answer_task();
        task.fields.push(crate::types::FieldSpec::output("answer", "again"));
        assert!(validate_task(&task).is_err());
    }

    #[test]
    fn test_validate_rejects_two_rationales() {
        let mut task = crate::builtin::answer_task();
        task.fields.push(crate::types::FieldSpec::rationale("more_reasoning", ""));
        assert!(validate_task(&task).is_err());
    }

    #[test]
    fn test_builtins_are_valid() {
        assert!(validate_task(&crate::builtin::answer_task()).is_ok());
        assert!(validate_task(&crate::builtin::evaluate_task()).is_ok());
    }
}
