//! Stats command handler.
//!
//! Shows how a table was built and how many passages it holds.

use clap::Args;
use ragcheck_core::config::AppConfig;
use ragcheck_knowledge::DEFAULT_TABLE;

/// Show table statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Table to inspect
    #[arg(short, long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing stats command");
        tracing::debug!("Stats options: {:?}", self);

        let stats = ragcheck_knowledge::stats(&config.workspace, &self.table).await?;

        if self.json {
            return super::print_json(&stats);
        }

        println!("Table: {}", stats.table);
        if !stats.exists {
            println!("  Not ingested yet (run 'ragcheck ingest <FILE>')");
        }
        println!("  Backend: {}", stats.backend);
        println!("  Location: {}", stats.location.display());
        println!("  Rows: {}", stats.rows);
        println!("  Chunk size: {} words", stats.chunk_size);
        println!("  Top-k: {}", stats.top_k);
        println!("  Vector weight: {}", stats.reranker_weight);
        println!(
            "  Embedding: {} / {} ({} dims)",
            stats.embedding.provider, stats.embedding.model, stats.embedding.dimensions
        );
        if let Some(at) = stats.last_ingested_at {
            println!("  Last ingested: {}", at.to_rfc3339());
        }

        Ok(())
    }
}
