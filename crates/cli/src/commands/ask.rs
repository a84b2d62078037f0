//! Ask command handler.
//!
//! Runs one query through the full guarded pipeline: retrieval, prompt
//! building, guardrail scan, completion, audit.

use clap::Args;

use safechat_core::{AppConfig, AppResult};
use safechat_pipeline::ChatRequest;

/// Ask a question through the guarded pipeline
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// User identifier recorded in the audit log
    #[arg(short, long, default_value = "local")]
    pub user: String,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<u32>,

    /// Use the in-process guardrail scanner instead of the hosted gateway
    #[arg(long)]
    pub offline: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }

        let pipeline = super::build_pipeline(&config, self.offline)?;
        let request = ChatRequest::new(self.user.clone(), self.query.clone());
        let response = pipeline.handle(request).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(());
        }

        if response.is_blocked() {
            println!("VERDICT: BLOCKED");
            println!("{}", response.answer);
            return Ok(());
        }

        println!("{}", response.answer);

        if !response.citations.is_empty() {
            println!();
            println!("Sources:");
            for citation in &response.citations {
                println!(
                    "[{}] {} (chunk {})",
                    citation.index, citation.doc_id, citation.position
                );
            }
        }

        Ok(())
    }
}
