//! Completion provider factory.
//!
//! Creates completion clients from the application configuration: the
//! provider string selects the implementation, the optional endpoint
//! overrides its default URL.

use std::sync::Arc;
use std::time::Duration;

use safechat_core::{AppError, AppResult};

use crate::client::CompletionClient;
use crate::providers::OllamaClient;

/// Create a completion client for the named provider.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `timeout` - Per-attempt request timeout
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn CompletionClient>> {
    match provider.to_lowercase().as_str() {
        "ollama" => {
            let client = match endpoint {
                Some(url) => OllamaClient::new(url, timeout)?,
                None => OllamaClient::local(timeout)?,
            };
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!(
            "Unknown completion provider: '{}'. Supported providers: ollama",
            provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, Duration::from_secs(30));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://llm:11434"), Duration::from_secs(30));
        assert!(client.is_ok());
    }

    #[test]
    fn test_unknown_provider() {
        let err = match create_client("unknown", None, Duration::from_secs(30)) {
            Ok(_) => panic!("expected an error for unknown provider"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("Unknown completion provider"));
    }
}
