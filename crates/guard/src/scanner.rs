//! In-process guardrail scanner.
//!
//! Applies the gateway policy locally: account/card numbers block the
//! request, hostile language is redacted, everything else passes. Used for
//! offline operation and as the deterministic gateway in tests.

use regex::Regex;

use safechat_core::{AppError, AppResult};

use crate::gateway::GuardrailGateway;
use crate::verdict::{TriggerCategory, Verdict};

/// Account/card numbers: four groups of four digits, optionally separated.
const PII_PATTERN: &str = r"\b\d{4}[- ]?\d{4}[- ]?\d{4}[- ]?\d{4}\b";

/// Hostile/profane terms. Longer alternatives first so "bullshit" is not
/// half-matched as "shit".
const PROFANITY_PATTERN: &str = r"(?i)\b(bullshit|shit|fuck\w*|crap|damn|bastard)\b";

/// Substitution for redacted terms.
const REDACTION_MARK: &str = "****";

/// Local policy scanner.
pub struct LocalScanner {
    pii: Regex,
    profanity: Regex,
}

impl LocalScanner {
    /// Create a new scanner with the built-in policy patterns.
    pub fn new() -> AppResult<Self> {
        let pii = Regex::new(PII_PATTERN)
            .map_err(|e| AppError::Config(format!("Invalid PII pattern: {}", e)))?;
        let profanity = Regex::new(PROFANITY_PATTERN)
            .map_err(|e| AppError::Config(format!("Invalid profanity pattern: {}", e)))?;

        Ok(Self { pii, profanity })
    }

    /// Apply the policy to a prompt.
    ///
    /// PII takes precedence: a prompt containing both an account number and
    /// profanity is blocked, not redacted.
    fn apply_policy(&self, prompt: &str) -> Verdict {
        if self.pii.is_match(prompt) {
            return Verdict::blocked(TriggerCategory::Pii);
        }

        if self.profanity.is_match(prompt) {
            let redacted = self.profanity.replace_all(prompt, REDACTION_MARK);
            return Verdict::redacted(TriggerCategory::Profanity, redacted.into_owned());
        }

        Verdict::allowed()
    }
}

#[async_trait::async_trait]
impl GuardrailGateway for LocalScanner {
    fn gateway_name(&self) -> &str {
        "local"
    }

    async fn scan(&self, prompt: &str) -> AppResult<Verdict> {
        let verdict = self.apply_policy(prompt);
        tracing::debug!(
            "Local scan verdict: {} ({})",
            verdict.outcome.as_str(),
            verdict.category.as_str()
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::ScanOutcome;

    #[tokio::test]
    async fn test_benign_prompt_is_allowed() {
        let scanner = LocalScanner::new().unwrap();
        let prompt = "Can you explain the difference between a Roth IRA and a 401k?";

        let verdict = scanner.scan(prompt).await.unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Allowed);
        assert_eq!(verdict.category, TriggerCategory::None);
        assert_eq!(verdict.forwardable_text(prompt), Some(prompt));
    }

    #[tokio::test]
    async fn test_account_number_is_blocked() {
        let scanner = LocalScanner::new().unwrap();
        let prompt = "I need to check the balance for account number 4532-1111-2222-9999.";

        let verdict = scanner.scan(prompt).await.unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Blocked);
        assert_eq!(verdict.category, TriggerCategory::Pii);
        assert_eq!(verdict.forwardable_text(prompt), None);
    }

    #[tokio::test]
    async fn test_unseparated_card_number_is_blocked() {
        let scanner = LocalScanner::new().unwrap();
        let verdict = scanner.scan("my card is 4532111122229999 thanks").await.unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Blocked);
    }

    #[tokio::test]
    async fn test_profanity_is_redacted() {
        let scanner = LocalScanner::new().unwrap();
        let prompt = "This legacy code is crap, how do I refactor it?";

        let verdict = scanner.scan(prompt).await.unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Redacted);
        assert_eq!(verdict.category, TriggerCategory::Profanity);

        let redacted = verdict.redacted.as_deref().unwrap();
        assert!(!redacted.contains("crap"));
        assert!(redacted.contains("****"));
        assert!(redacted.contains("how do I refactor it?"));
    }

    #[tokio::test]
    async fn test_redacted_text_has_no_profanity() {
        let scanner = LocalScanner::new().unwrap();
        let prompt = "this is bullshit and total crap, damn it";

        let verdict = scanner.scan(prompt).await.unwrap();
        let redacted = verdict.redacted.as_deref().unwrap().to_lowercase();

        for term in ["bullshit", "shit", "crap", "damn"] {
            assert!(!redacted.contains(term), "'{}' survived redaction", term);
        }
    }

    #[tokio::test]
    async fn test_pii_wins_over_profanity() {
        let scanner = LocalScanner::new().unwrap();
        let prompt = "this damn account 4532 1111 2222 9999 is wrong";

        let verdict = scanner.scan(prompt).await.unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Blocked);
        assert_eq!(verdict.category, TriggerCategory::Pii);
    }

    #[tokio::test]
    async fn test_profanity_inside_words_is_kept() {
        let scanner = LocalScanner::new().unwrap();

        // "scrap" and "grape" must not trip the word-boundary patterns
        let verdict = scanner.scan("scrap the grape contract").await.unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Allowed);
    }

    #[tokio::test]
    async fn test_short_digit_runs_are_allowed() {
        let scanner = LocalScanner::new().unwrap();
        let verdict = scanner
            .scan("the 2024 contribution limit is 23000 dollars")
            .await
            .unwrap();
        assert_eq!(verdict.outcome, ScanOutcome::Allowed);
    }
}
