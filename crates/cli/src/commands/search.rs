//! Search command handler: retrieval only, no generation.

use clap::Args;
use ragcheck_core::config::AppConfig;
use ragcheck_knowledge::{config::load_config, DEFAULT_TABLE};

/// Show fused retrieval results for a query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// The query to search for
    pub query: String,

    /// Table to search
    #[arg(short, long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Results to show (default: table config, 3)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn fmt_score(score: Option<f32>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{:.3}", s))
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing search command");
        tracing::debug!("Search options: {:?}", self);

        let top_k = match self.top_k {
            Some(top_k) => top_k,
            None => load_config(&config.workspace, &self.table)?.top_k,
        };

        let retriever = ragcheck_knowledge::retriever(&config.workspace, &self.table).await?;
        let results = retriever.search(&self.query, top_k).await?;

        if self.json {
            return super::print_json(&results);
        }

        if results.is_empty() {
            println!("No results");
            return Ok(());
        }

        for (rank, passage) in results.iter().enumerate() {
            println!(
                "{}. score {:.3} (lexical {}, vector {})",
                rank + 1,
                passage.score,
                fmt_score(passage.lexical_score),
                fmt_score(passage.vector_score)
            );
            println!("   {}", passage.text);
        }

        Ok(())
    }
}
