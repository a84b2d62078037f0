//! Guardrail integration for the SafeChat pipeline.
//!
//! Every prompt passes through a moderation gateway before it may reach the
//! completion provider. The gateway returns a [`Verdict`]: allow the prompt
//! unchanged, block it outright, or substitute a redacted payload.
//!
//! Two implementations are provided behind the [`GuardrailGateway`] trait:
//! - [`HttpGateway`]: the hosted moderation service (bearer token, retries)
//! - [`LocalScanner`]: an in-process policy engine for offline use and tests

pub mod gateway;
pub mod http;
pub mod scanner;
pub mod verdict;

// Re-export main types
pub use gateway::GuardrailGateway;
pub use http::HttpGateway;
pub use scanner::LocalScanner;
pub use verdict::{ScanOutcome, TriggerCategory, Verdict, SECURITY_BLOCK_MSG};
