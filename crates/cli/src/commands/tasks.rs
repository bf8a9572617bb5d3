//! Tasks command handler.
//!
//! Lists the prompt tasks available in the workspace and checks that each
//! one loads.

use clap::Args;
use ragcheck_core::config::{AppConfig, STATE_DIR};
use ragcheck_prompt::{builtin::builtin_task, list_tasks, load_task};
use serde::Serialize;
use std::path::Path;

/// List prompt tasks and workspace overrides
#[derive(Args, Debug)]
pub struct TasksCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TaskEntry {
    pub id: String,
    pub builtin: bool,
    pub overridden: bool,
    /// Load error, if the task does not load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Every task id with where it comes from and whether it loads.
pub fn describe_tasks(workspace: &Path) -> anyhow::Result<Vec<TaskEntry>> {
    let tasks_dir = workspace.join(STATE_DIR).join("tasks");

    Ok(list_tasks(workspace)?
        .into_iter()
        .map(|id| TaskEntry {
            builtin: builtin_task(&id).is_some(),
            overridden: tasks_dir.join(format!("{}.yml", id)).is_file(),
            error: load_task(workspace, &id).err().map(|e| e.to_string()),
            id,
        })
        .collect())
}

impl TasksCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing tasks command");

        let entries = describe_tasks(&config.workspace)?;

        if self.json {
            return super::print_json(&entries);
        }

        for entry in &entries {
            let source = match (entry.builtin, entry.overridden) {
                (true, true) => "built-in, overridden",
                (true, false) => "built-in",
                _ => "workspace",
            };
            match &entry.error {
                Some(error) => println!("{} ({}) - invalid: {}", entry.id, source, error),
                None => println!("{} ({})", entry.id, source),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_describe_tasks() {
        let temp = TempDir::new().unwrap();
        let tasks = temp.path().join(STATE_DIR).join("tasks");
        fs::create_dir_all(&tasks).unwrap();
        fs::write(
            tasks.join("evaluate.yml"),
            "id: evaluate\ninstructions: Grade strictly.\nfields:\n  - { name: answer, role: input }\n  - { name: accuracy_metric, role: output }\n",
        )
        .unwrap();
        fs::write(tasks.join("broken.yml"), "invalid: yaml: content:").unwrap();

        let entries = describe_tasks(temp.path()).unwrap();
        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["answer", "broken", "evaluate"]);

        assert!(entries[0].builtin && !entries[0].overridden && entries[0].error.is_none());
        assert!(!entries[1].builtin && entries[1].overridden && entries[1].error.is_some());
        assert!(entries[2].builtin && entries[2].overridden && entries[2].error.is_none());
    }
}
