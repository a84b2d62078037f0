//! HTTP guardrail gateway client.
//!
//! Submits prompts to the hosted moderation gateway's prompts endpoint and
//! parses the verdict envelope. Transient failures (timeouts, 5xx, 429) are
//! retried with bounded exponential backoff; anything else surfaces
//! immediately.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use safechat_core::{AppError, AppResult};

use crate::gateway::GuardrailGateway;
use crate::verdict::{ScanOutcome, TriggerCategory, Verdict};

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 200;

/// Request payload for the gateway prompts endpoint.
#[derive(Debug, Serialize)]
struct ScanRequest<'a> {
    input: &'a str,
    project: &'a str,
}

/// Response envelope from the gateway.
#[derive(Debug, Deserialize)]
struct ScanEnvelope {
    result: ScanResult,
}

#[derive(Debug, Deserialize)]
struct ScanResult {
    outcome: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    redacted: Option<String>,
}

/// HTTP client for the hosted moderation gateway.
pub struct HttpGateway {
    client: Client,
    endpoint: String,
    project: String,
    token: String,
}

impl HttpGateway {
    /// Create a new gateway client.
    ///
    /// # Arguments
    /// * `endpoint` - Prompts endpoint URL
    /// * `project` - Gateway project identifier
    /// * `token` - Bearer token
    /// * `timeout` - Per-attempt request timeout
    pub fn new(
        endpoint: impl Into<String>,
        project: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create gateway client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            project: project.into(),
            token: token.into(),
        })
    }

    /// Submit one scan request (no retries).
    async fn scan_once(&self, prompt: &str) -> AppResult<Verdict> {
        let request = ScanRequest {
            input: prompt,
            project: &self.project,
        };

        debug!("Submitting prompt to gateway at {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Failed to reach gateway: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            // 4xx (other than throttling) will not improve on retry
            if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                return Err(AppError::Guard(format!(
                    "Gateway rejected request ({}): {}",
                    status, error_text
                )));
            }

            return Err(AppError::Gateway(format!(
                "Gateway error ({}): {}",
                status, error_text
            )));
        }

        let envelope: ScanEnvelope = response
            .json()
            .await
            .map_err(|e| AppError::Guard(format!("Malformed gateway response: {}", e)))?;

        parse_verdict(envelope.result)
    }
}

/// Convert the wire result into a typed verdict.
fn parse_verdict(result: ScanResult) -> AppResult<Verdict> {
    let outcome = ScanOutcome::parse(&result.outcome).ok_or_else(|| {
        AppError::Guard(format!("Unknown gateway outcome: '{}'", result.outcome))
    })?;

    let category = match result.category.as_deref() {
        Some(s) => TriggerCategory::parse(s)
            .ok_or_else(|| AppError::Guard(format!("Unknown gateway category: '{}'", s)))?,
        None => TriggerCategory::None,
    };

    match outcome {
        ScanOutcome::Allowed => Ok(Verdict::allowed()),
        ScanOutcome::Blocked => Ok(Verdict::blocked(category)),
        ScanOutcome::Redacted => {
            let text = result.redacted.ok_or_else(|| {
                AppError::Guard("Redacted verdict without redacted payload".to_string())
            })?;
            Ok(Verdict::redacted(category, text))
        }
    }
}

#[async_trait::async_trait]
impl GuardrailGateway for HttpGateway {
    fn gateway_name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len(), project = %self.project))]
    async fn scan(&self, prompt: &str) -> AppResult<Verdict> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < MAX_RETRIES {
            match self.scan_once(prompt).await {
                Ok(verdict) => {
                    debug!("Gateway verdict: {}", verdict.outcome.as_str());
                    return Ok(verdict);
                }
                // Malformed verdicts will not improve on retry
                Err(e @ AppError::Guard(_)) => return Err(e),
                Err(e) => {
                    attempt += 1;
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                        warn!(
                            "Gateway scan failed (attempt {}/{}), retrying in {}ms",
                            attempt, MAX_RETRIES, backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Gateway("Unknown gateway failure".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: &str, category: Option<&str>, redacted: Option<&str>) -> ScanResult {
        ScanResult {
            outcome: outcome.to_string(),
            category: category.map(str::to_string),
            redacted: redacted.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_allowed_verdict() {
        let verdict = parse_verdict(result("allowed", None, None)).unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Allowed);
        assert_eq!(verdict.category, TriggerCategory::None);
    }

    #[test]
    fn test_parse_blocked_pii_verdict() {
        let verdict = parse_verdict(result("blocked", Some("pii"), None)).unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Blocked);
        assert_eq!(verdict.category, TriggerCategory::Pii);
    }

    #[test]
    fn test_parse_redacted_verdict() {
        let verdict =
            parse_verdict(result("redacted", Some("profanity"), Some("clean text"))).unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Redacted);
        assert_eq!(verdict.category, TriggerCategory::Profanity);
        assert_eq!(verdict.redacted.as_deref(), Some("clean text"));
    }

    #[test]
    fn test_parse_redacted_without_payload_fails() {
        let err = parse_verdict(result("redacted", Some("profanity"), None)).unwrap_err();
        assert!(matches!(err, AppError::Guard(_)));
    }

    #[test]
    fn test_parse_unknown_outcome_fails() {
        let err = parse_verdict(result("quarantined", None, None)).unwrap_err();
        assert!(matches!(err, AppError::Guard(_)));
    }

    #[test]
    fn test_envelope_deserialization() {
        let json = r#"{"result":{"outcome":"blocked","category":"pii"}}"#;
        let envelope: ScanEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.result.outcome, "blocked");
        assert_eq!(envelope.result.category.as_deref(), Some("pii"));
        assert!(envelope.result.redacted.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_gateway_error() {
        // Reserved TEST-NET address: connection fails fast
        let gateway = HttpGateway::new(
            "http://192.0.2.1:9/backend/v1/prompts",
            "proj",
            "token",
            Duration::from_millis(200),
        )
        .unwrap();

        let err = gateway.scan("hello").await.unwrap_err();
        assert!(matches!(err, AppError::Gateway(_)));
    }
}
