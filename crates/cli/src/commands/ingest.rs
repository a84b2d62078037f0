//! Ingest command handler.
//!
//! Builds or refreshes the knowledge index from a document directory.

use clap::Args;
use std::path::PathBuf;

use safechat_core::{AppConfig, AppResult};
use safechat_kb::IngestOptions;

/// Ingest a knowledge base directory into the index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Directory containing the knowledge base documents
    pub dir: PathBuf,

    /// Reset the index before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {:?}", self.dir);

        let embedder = safechat_kb::embeddings::create_provider(&config.embedding)?;

        let options = IngestOptions {
            kb_dir: self.dir.clone(),
            chunk_size: config.retrieval.chunk_size as usize,
            chunk_overlap: config.retrieval.chunk_overlap as usize,
            reset: self.reset,
        };

        let stats = safechat_kb::ingest(&config.index_path(), embedder, &options).await?;

        if self.json {
            let output = serde_json::json!({
                "documentsCount": stats.documents_count,
                "chunksCount": stats.chunks_count,
                "bytesProcessed": stats.bytes_processed,
                "restrictedRejected": stats.restricted_rejected,
                "skipped": stats.skipped,
                "durationSecs": stats.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Ingested {} documents ({} chunks, {} bytes) in {:.2}s",
                stats.documents_count,
                stats.chunks_count,
                stats.bytes_processed,
                stats.duration_secs
            );
            if stats.restricted_rejected > 0 {
                println!(
                    "Rejected {} Restricted document(s); they were not ingested",
                    stats.restricted_rejected
                );
            }
            if stats.skipped > 0 {
                println!("Skipped {} unparseable file(s)", stats.skipped);
            }
        }

        Ok(())
    }
}
