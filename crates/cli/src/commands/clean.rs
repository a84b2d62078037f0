//! Clean command handler.

use clap::Args;

use safechat_core::{AppConfig, AppResult};

/// Reset the knowledge index
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command");

        safechat_kb::clean(&config.index_path())?;

        println!("Knowledge index cleaned");

        Ok(())
    }
}
