//! Command handlers for the ragcheck CLI.
//!
//! This module organizes all CLI commands into separate submodules.

pub mod ask;
pub mod ingest;
pub mod search;
pub mod stats;
pub mod tasks;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;
pub use tasks::TasksCommand;

use anyhow::Context;
use ragcheck_core::config::AppConfig;
use ragcheck_llm::{create_client, LlmClient};
use std::sync::Arc;

/// Build the LLM client for the configured provider.
pub(crate) fn llm_client(config: &AppConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    config.validate()?;

    let endpoint = config.resolve_endpoint(&config.provider);
    let api_key = config.resolve_api_key(&config.provider);

    create_client(&config.provider, endpoint.as_deref(), api_key.as_deref())
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("Failed to create '{}' client", config.provider))
}

/// Print a serializable value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
