//! Ask command handler.
//!
//! Retrieves context, generates an answer and grades it.

use clap::Args;
use ragcheck_core::config::AppConfig;
use ragcheck_knowledge::DEFAULT_TABLE;

/// Answer a question and grade the answer
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Table to retrieve context from
    #[arg(short, long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Passages to retrieve (default: table config, 3)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask options: {:?}", self);

        let client = super::llm_client(config)?;
        let assistant = ragcheck_knowledge::assistant(
            &config.workspace,
            &self.table,
            client,
            &config.model,
            self.top_k,
        )
        .await?;

        let response = assistant.process(&self.query).await?;

        if self.json {
            super::print_json(&response)?;
        } else {
            println!("Answer:");
            println!("{}", response.answer);
            println!();
            match response.accuracy_metric.score() {
                Some(score) => println!("Accuracy: {}/10", score),
                None => println!("Accuracy (unparsed): {}", response.accuracy_metric),
            }
            println!("{}", response.rationale_metric);
        }

        Ok(())
    }
}
