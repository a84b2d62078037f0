//! Ollama completion provider.
//!
//! Non-streaming completions against a local Ollama runtime, with a request
//! timeout and bounded exponential-backoff retry.
//! Ollama API: https://github.com/ollama/ollama/blob/main/docs/api.md

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use safechat_core::{AppError, AppResult};

use crate::client::{CompletionClient, CompletionRequest, CompletionResponse, CompletionUsage};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Maximum retry attempts for failed requests
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 200;

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    stream: bool,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama completion client.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client with a custom base URL and timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create Ollama client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// Create a client against the default local endpoint.
    pub fn local(timeout: Duration) -> AppResult<Self> {
        Self::new(DEFAULT_OLLAMA_URL, timeout)
    }

    /// Convert a CompletionRequest to Ollama format.
    fn to_ollama_request(&self, request: &CompletionRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system.clone(),
            temperature: request.temperature,
            num_predict: request.max_tokens,
            stream: false,
        }
    }

    /// Submit one completion request (no retries).
    async fn complete_once(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        let ollama_request = self.to_ollama_request(request);
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ollama_request)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to reach Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Provider(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(CompletionResponse {
            content: ollama_response.response,
            model: ollama_response.model,
            usage: CompletionUsage::new(
                ollama_response.prompt_eval_count.unwrap_or(0),
                ollama_response.eval_count.unwrap_or(0),
            ),
        })
    }
}

#[async_trait::async_trait]
impl CompletionClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model, prompt_len = request.prompt.len()))]
    async fn complete(&self, request: &CompletionRequest) -> AppResult<CompletionResponse> {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt < MAX_RETRIES {
            match self.complete_once(request).await {
                Ok(response) => {
                    debug!("Received completion from Ollama");
                    return Ok(response);
                }
                Err(e) => {
                    attempt += 1;
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                        warn!(
                            "Completion failed (attempt {}/{}), retrying in {}ms",
                            attempt, MAX_RETRIES, backoff_ms
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Provider("Unknown completion failure".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_client_creation() {
        let client = OllamaClient::local(Duration::from_secs(30)).unwrap();
        assert_eq!(client.provider_name(), "ollama");
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_ollama_request_conversion() {
        let client = OllamaClient::local(Duration::from_secs(30)).unwrap();
        let request = CompletionRequest::new("Hello", "llama3.2")
            .with_temperature(0.3)
            .with_max_tokens(500);

        let ollama_req = client.to_ollama_request(&request);
        assert_eq!(ollama_req.model, "llama3.2");
        assert_eq!(ollama_req.prompt, "Hello");
        assert_eq!(ollama_req.temperature, Some(0.3));
        assert_eq!(ollama_req.num_predict, Some(500));
        assert!(!ollama_req.stream);
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_provider_error() {
        // Reserved TEST-NET address: connection fails fast
        let client = OllamaClient::new("http://192.0.2.1:9", Duration::from_millis(200)).unwrap();
        let request = CompletionRequest::new("Hello", "llama3.2");

        let err = client.complete(&request).await.unwrap_err();
        assert!(matches!(err, AppError::Provider(_)));
    }
}
