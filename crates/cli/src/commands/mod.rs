//! Command handlers for the SafeChat CLI.
//!
//! This module organizes all CLI commands into separate submodules and
//! holds the shared pipeline assembly used by `ask` and `validate`.

pub mod ask;
pub mod clean;
pub mod ingest;
pub mod stats;
pub mod validate;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use clean::CleanCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;
pub use validate::ValidateCommand;

use std::sync::Arc;
use std::time::Duration;

use safechat_core::{AppConfig, AppError, AppResult};
use safechat_guard::{GuardrailGateway, HttpGateway, LocalScanner};
use safechat_kb::Retriever;
use safechat_pipeline::{AuditLogger, ChatPipeline};

/// Assemble the guarded pipeline from configuration.
///
/// With `offline` the in-process scanner replaces the hosted gateway; the
/// rest of the pipeline is identical, so verdict handling stays on the same
/// code path in both modes.
pub(crate) fn build_pipeline(config: &AppConfig, offline: bool) -> AppResult<ChatPipeline> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let embedder = safechat_kb::embeddings::create_provider(&config.embedding)?;
    let retriever = Retriever::new(
        config.index_path(),
        embedder,
        config.retrieval.min_score,
    );

    let gateway: Arc<dyn GuardrailGateway> = if offline {
        tracing::info!("Using local guardrail scanner (offline mode)");
        Arc::new(LocalScanner::new()?)
    } else {
        config.validate_gateway()?;
        let token = config.resolve_gateway_token().ok_or_else(|| {
            AppError::Config(format!(
                "Gateway token not found in environment variable: {}",
                config.gateway.token_env
            ))
        })?;
        Arc::new(HttpGateway::new(
            &config.gateway.endpoint,
            &config.gateway.project,
            token,
            timeout,
        )?)
    };

    let completion = safechat_llm::create_client(
        &config.provider,
        config.llm_endpoint.as_deref(),
        timeout,
    )?;

    let audit = Arc::new(AuditLogger::open(config.audit_log_path())?);

    Ok(ChatPipeline::new(
        retriever,
        gateway,
        completion,
        audit,
        &config.model,
        config.retrieval.top_k as usize,
        timeout,
    ))
}
