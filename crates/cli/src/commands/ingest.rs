//! Ingest command handler.

use anyhow::Context;
use clap::Args;
use ragcheck_core::config::AppConfig;
use ragcheck_knowledge::{IngestOptions, StoreBackend, DEFAULT_TABLE};
use std::path::PathBuf;

/// Chunk and index a text corpus
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Text file to ingest
    pub file: PathBuf,

    /// Target table
    #[arg(short, long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Words per chunk (default: table config, 50)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Storage backend (sqlite, lancedb)
    #[arg(long, value_parser = parse_backend)]
    pub backend: Option<StoreBackend>,

    /// Storage directory
    #[arg(long)]
    pub storage: Option<PathBuf>,

    /// Drop the table before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_backend(s: &str) -> Result<StoreBackend, String> {
    StoreBackend::parse(s).ok_or_else(|| format!("unknown backend '{}' (sqlite, lancedb)", s))
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ingest command");
        tracing::debug!("Ingest options: {:?}", self);

        let text = std::fs::read_to_string(&self.file)
            .with_context(|| format!("Failed to read {:?}", self.file))?;

        let options = IngestOptions {
            chunk_size: self.chunk_size,
            backend: self.backend,
            location: self.storage.clone(),
            reset: self.reset,
            ..IngestOptions::new(&self.table, text)
        };

        let stats = ragcheck_knowledge::ingest(&config.workspace, options).await?;

        if self.json {
            super::print_json(&stats)?;
        } else if stats.created {
            println!(
                "Ingested {} chunks into '{}' ({}, {:.2}s)",
                stats.chunks, stats.table, stats.backend, stats.duration_secs
            );
            println!("  Location: {}", stats.location.display());
        } else {
            println!(
                "Table '{}' already exists with {} rows; nothing ingested (use --reset to rebuild)",
                stats.table, stats.rows
            );
        }

        Ok(())
    }
}
