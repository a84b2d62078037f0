//! Guardrail gateway abstraction.

use safechat_core::AppResult;

use crate::verdict::Verdict;

/// Trait for guardrail gateways.
///
/// Implementations scan a composed prompt and return a verdict. The trait is
/// the seam that keeps the pipeline vendor-neutral: the hosted HTTP gateway
/// and the in-process scanner are interchangeable.
#[async_trait::async_trait]
pub trait GuardrailGateway: Send + Sync {
    /// Get the gateway name (e.g., "http", "local").
    fn gateway_name(&self) -> &str;

    /// Scan a prompt and return the policy verdict.
    ///
    /// # Errors
    /// `Gateway` when the scan could not be performed (network failure,
    /// timeout after retries); `Guard` when the gateway responded with a
    /// malformed verdict.
    async fn scan(&self, prompt: &str) -> AppResult<Verdict>;
}
