//! Guarded RAG request pipeline.
//!
//! Orchestrates one user request end to end: retrieve context, build the
//! grounded prompt, submit it to the guardrail gateway, forward the approved
//! (or redacted) text to the completion provider, and write exactly one
//! audit record regardless of how the request ends.
//!
//! Requests are handled independently and concurrently: the index is
//! read-shared, the audit log serializes its own appends, and nothing else
//! is mutable across requests.

pub mod audit;
pub mod state;

// Re-export commonly used types
pub use audit::{AuditLogger, AuditRecord};
pub use state::{RequestState, RequestTrace};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use safechat_core::{AppError, AppResult};
use safechat_guard::{GuardrailGateway, ScanOutcome, TriggerCategory, Verdict, SECURITY_BLOCK_MSG};
use safechat_kb::Retriever;
use safechat_llm::{CompletionClient, CompletionRequest};
use safechat_prompt::{build_grounded_prompt, Citation};

/// Sampling temperature for grounded answers; low, because the contract is
/// factual restatement of context, not creativity.
const ANSWER_TEMPERATURE: f32 = 0.3;

/// Cap on generated answer length.
const ANSWER_MAX_TOKENS: u32 = 1000;

/// One user request entering the pipeline. Ephemeral; persisted only inside
/// its audit record.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Unique request identifier
    pub request_id: String,

    /// User identifier (opaque audit dimension)
    pub user_id: String,

    /// Raw query text
    pub query: String,

    /// When the request was received
    pub timestamp: DateTime<Utc>,
}

impl ChatRequest {
    /// Create a new request with a fresh identifier.
    pub fn new(user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            query: query.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The response returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The request this response answers
    pub request_id: String,

    /// Answer text, or the security warning for blocked requests
    pub answer: String,

    /// Guardrail outcome for the request
    pub outcome: ScanOutcome,

    /// Category that triggered a non-allowed outcome
    pub category: TriggerCategory,

    /// Sources behind the answer, in citation order
    pub citations: Vec<Citation>,
}

impl ChatResponse {
    /// Whether the request was blocked by policy.
    pub fn is_blocked(&self) -> bool {
        self.outcome == ScanOutcome::Blocked
    }
}

/// The guarded RAG pipeline.
///
/// One value serves all requests; every field is either immutable or
/// internally synchronized.
pub struct ChatPipeline {
    retriever: Retriever,
    gateway: Arc<dyn GuardrailGateway>,
    completion: Arc<dyn CompletionClient>,
    audit: Arc<AuditLogger>,
    model: String,
    top_k: usize,
    request_timeout: Duration,
}

impl ChatPipeline {
    /// Assemble a pipeline from its parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        retriever: Retriever,
        gateway: Arc<dyn GuardrailGateway>,
        completion: Arc<dyn CompletionClient>,
        audit: Arc<AuditLogger>,
        model: impl Into<String>,
        top_k: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            gateway,
            completion,
            audit,
            model: model.into(),
            top_k,
            request_timeout,
        }
    }

    /// Handle one request end to end.
    ///
    /// Exactly one audit record is written per call, on every path: the
    /// record is synced to disk before this method returns, success or
    /// failure. Blocked requests return a normal response carrying the
    /// security warning; they are not errors.
    pub async fn handle(&self, request: ChatRequest) -> AppResult<ChatResponse> {
        tracing::info!(
            request_id = %request.request_id,
            user_id = %request.user_id,
            "Handling chat request"
        );

        let mut trace = RequestTrace::new();
        let mut verdict: Option<Verdict> = None;

        let result = self.run(&request, &mut trace, &mut verdict).await;

        let record = AuditRecord {
            record_id: uuid::Uuid::new_v4().to_string(),
            request_id: request.request_id.clone(),
            timestamp: Utc::now(),
            user_id: request.user_id.clone(),
            query: request.query.clone(),
            outcome: verdict.as_ref().map(|v| v.outcome),
            category: verdict.as_ref().map(|v| v.category),
            terminal_state: trace.state().as_str().to_string(),
            error: result.as_ref().err().map(|e| e.to_string()),
        };

        // Write-ahead: the record lands on disk before the caller sees the
        // response. An audit failure outranks the pipeline result.
        self.audit.append(&record)?;
        trace.advance(RequestState::Logged)?;

        match &result {
            Ok(response) => tracing::info!(
                request_id = %request.request_id,
                outcome = response.outcome.as_str(),
                "Request finished"
            ),
            Err(e) => tracing::error!(
                request_id = %request.request_id,
                "Request failed: {}", e
            ),
        }

        result
    }

    /// The request body: everything between Received and the audit write.
    async fn run(
        &self,
        request: &ChatRequest,
        trace: &mut RequestTrace,
        verdict_out: &mut Option<Verdict>,
    ) -> AppResult<ChatResponse> {
        // Retrieve
        let chunks = self.retriever.retrieve(&request.query, self.top_k).await?;
        trace.advance(RequestState::Retrieved)?;

        // Build the grounded prompt
        let prompt = build_grounded_prompt(&request.query, &chunks)?;
        trace.advance(RequestState::PromptBuilt)?;

        // Scan through the guardrail, under the request deadline
        let verdict = tokio::time::timeout(self.request_timeout, self.gateway.scan(&prompt.text))
            .await
            .map_err(|_| {
                AppError::Gateway(format!(
                    "Gateway scan exceeded {}s deadline",
                    self.request_timeout.as_secs()
                ))
            })??;
        trace.advance(RequestState::Scanned(verdict.outcome))?;
        *verdict_out = Some(verdict.clone());

        let Some(final_text) = verdict.forwardable_text(&prompt.text) else {
            // Blocked: short-circuit with the security warning, no completion
            trace.advance(RequestState::Rejected)?;
            tracing::warn!(
                request_id = %request.request_id,
                category = verdict.category.as_str(),
                "Request blocked by guardrail policy"
            );

            return Ok(ChatResponse {
                request_id: request.request_id.clone(),
                answer: SECURITY_BLOCK_MSG.to_string(),
                outcome: verdict.outcome,
                category: verdict.category,
                citations: prompt.citations,
            });
        };

        // Complete, under the request deadline
        let completion_request = CompletionRequest::new(final_text, &self.model)
            .with_temperature(ANSWER_TEMPERATURE)
            .with_max_tokens(ANSWER_MAX_TOKENS);

        let completion = tokio::time::timeout(
            self.request_timeout,
            self.completion.complete(&completion_request),
        )
        .await
        .map_err(|_| {
            AppError::Provider(format!(
                "Completion exceeded {}s deadline",
                self.request_timeout.as_secs()
            ))
        })??;
        trace.advance(RequestState::Completed)?;

        Ok(ChatResponse {
            request_id: request.request_id.clone(),
            answer: completion.content,
            outcome: verdict.outcome,
            category: verdict.category,
            citations: prompt.citations,
        })
    }
}
