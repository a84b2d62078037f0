//! Guardrail verdict types.

use serde::{Deserialize, Serialize};

/// Warning returned to the caller when a prompt is blocked.
pub const SECURITY_BLOCK_MSG: &str =
    "Security Alert: Your message contained sensitive data and was blocked.";

/// Outcome of a guardrail scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanOutcome {
    /// The prompt may be forwarded unchanged
    Allowed,
    /// The prompt must not be forwarded; the request terminates
    Blocked,
    /// The prompt may be forwarded only in its redacted form
    Redacted,
}

impl ScanOutcome {
    /// Parse an outcome from the gateway wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "allowed" => Some(Self::Allowed),
            "blocked" => Some(Self::Blocked),
            "redacted" => Some(Self::Redacted),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Blocked => "blocked",
            Self::Redacted => "redacted",
        }
    }
}

/// Policy category that triggered a non-allowed verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerCategory {
    Pii,
    Profanity,
    None,
}

impl TriggerCategory {
    /// Parse a category from the gateway wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pii" => Some(Self::Pii),
            "profanity" | "moderation" => Some(Self::Profanity),
            "none" | "" => Some(Self::None),
            _ => None,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pii => "pii",
            Self::Profanity => "profanity",
            Self::None => "none",
        }
    }
}

/// A guardrail verdict for one scanned prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Scan outcome
    pub outcome: ScanOutcome,

    /// Category that triggered the outcome
    pub category: TriggerCategory,

    /// Redacted payload; present iff the outcome is `Redacted`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redacted: Option<String>,
}

impl Verdict {
    /// An allowing verdict.
    pub fn allowed() -> Self {
        Self {
            outcome: ScanOutcome::Allowed,
            category: TriggerCategory::None,
            redacted: None,
        }
    }

    /// A blocking verdict with the triggering category.
    pub fn blocked(category: TriggerCategory) -> Self {
        Self {
            outcome: ScanOutcome::Blocked,
            category,
            redacted: None,
        }
    }

    /// A redacting verdict carrying the substituted payload.
    pub fn redacted(category: TriggerCategory, text: impl Into<String>) -> Self {
        Self {
            outcome: ScanOutcome::Redacted,
            category,
            redacted: Some(text.into()),
        }
    }

    /// The text to forward to the completion provider, if any.
    ///
    /// `None` means the request must short-circuit (blocked). Redacted
    /// verdicts always forward the substituted payload, never the original.
    pub fn forwardable_text<'a>(&'a self, original: &'a str) -> Option<&'a str> {
        match self.outcome {
            ScanOutcome::Allowed => Some(original),
            ScanOutcome::Blocked => None,
            ScanOutcome::Redacted => self.redacted.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_parse() {
        assert_eq!(ScanOutcome::parse("allowed"), Some(ScanOutcome::Allowed));
        assert_eq!(ScanOutcome::parse("BLOCKED"), Some(ScanOutcome::Blocked));
        assert_eq!(ScanOutcome::parse(" redacted "), Some(ScanOutcome::Redacted));
        assert_eq!(ScanOutcome::parse("quarantined"), None);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(TriggerCategory::parse("pii"), Some(TriggerCategory::Pii));
        assert_eq!(
            TriggerCategory::parse("profanity"),
            Some(TriggerCategory::Profanity)
        );
        assert_eq!(
            TriggerCategory::parse("moderation"),
            Some(TriggerCategory::Profanity)
        );
        assert_eq!(TriggerCategory::parse(""), Some(TriggerCategory::None));
        assert_eq!(TriggerCategory::parse("malware"), None);
    }

    #[test]
    fn test_forwardable_text() {
        let original = "the original prompt";

        assert_eq!(
            Verdict::allowed().forwardable_text(original),
            Some(original)
        );
        assert_eq!(
            Verdict::blocked(TriggerCategory::Pii).forwardable_text(original),
            None
        );
        assert_eq!(
            Verdict::redacted(TriggerCategory::Profanity, "the **** prompt")
                .forwardable_text(original),
            Some("the **** prompt")
        );
    }
}
