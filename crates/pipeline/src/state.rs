//! Per-request state machine.
//!
//! Every request walks `Received -> Retrieved -> PromptBuilt -> Scanned ->
//! (Completed | Rejected) -> Logged`. A request that fails partway still
//! reaches `Logged`: the audit record is written from whatever state the
//! request stopped in.

use safechat_core::{AppError, AppResult};
use safechat_guard::ScanOutcome;

/// The state of a request as it moves through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Request accepted, nothing done yet
    Received,
    /// Chunks retrieved from the index
    Retrieved,
    /// Grounded prompt composed
    PromptBuilt,
    /// Guardrail verdict received
    Scanned(ScanOutcome),
    /// Completion returned an answer
    Completed,
    /// Short-circuited by a blocking verdict
    Rejected,
    /// Audit record written; terminal
    Logged,
}

impl RequestState {
    /// Whether `next` is a legal successor of this state.
    ///
    /// `Logged` is reachable from every non-terminal state because failed
    /// requests are audit-logged from wherever they stopped.
    pub fn can_advance_to(&self, next: &RequestState) -> bool {
        use RequestState::*;

        match (self, next) {
            (Received, Retrieved) => true,
            (Retrieved, PromptBuilt) => true,
            (PromptBuilt, Scanned(_)) => true,
            (Scanned(ScanOutcome::Allowed), Completed) => true,
            (Scanned(ScanOutcome::Redacted), Completed) => true,
            (Scanned(ScanOutcome::Blocked), Rejected) => true,
            (Logged, _) => false,
            (_, Logged) => true,
            _ => false,
        }
    }

    /// Whether this state ends the request lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Logged)
    }

    /// Get string representation (used in audit records).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Retrieved => "retrieved",
            Self::PromptBuilt => "prompt_built",
            Self::Scanned(ScanOutcome::Allowed) => "scanned:allowed",
            Self::Scanned(ScanOutcome::Blocked) => "scanned:blocked",
            Self::Scanned(ScanOutcome::Redacted) => "scanned:redacted",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Logged => "logged",
        }
    }
}

/// Tracks one request's progress and refuses illegal transitions.
#[derive(Debug)]
pub struct RequestTrace {
    state: RequestState,
}

impl RequestTrace {
    /// Start a trace in the `Received` state.
    pub fn new() -> Self {
        Self {
            state: RequestState::Received,
        }
    }

    /// Current state.
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Advance to the next state.
    ///
    /// An illegal transition is a pipeline bug, surfaced as an error rather
    /// than silently recorded.
    pub fn advance(&mut self, next: RequestState) -> AppResult<()> {
        if !self.state.can_advance_to(&next) {
            return Err(AppError::Other(format!(
                "Illegal request state transition: {} -> {}",
                self.state.as_str(),
                next.as_str()
            )));
        }

        tracing::trace!("Request state: {} -> {}", self.state.as_str(), next.as_str());
        self.state = next;
        Ok(())
    }
}

impl Default for RequestTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_allowed() {
        let mut trace = RequestTrace::new();
        trace.advance(RequestState::Retrieved).unwrap();
        trace.advance(RequestState::PromptBuilt).unwrap();
        trace
            .advance(RequestState::Scanned(ScanOutcome::Allowed))
            .unwrap();
        trace.advance(RequestState::Completed).unwrap();
        trace.advance(RequestState::Logged).unwrap();

        assert!(trace.state().is_terminal());
    }

    #[test]
    fn test_blocked_path() {
        let mut trace = RequestTrace::new();
        trace.advance(RequestState::Retrieved).unwrap();
        trace.advance(RequestState::PromptBuilt).unwrap();
        trace
            .advance(RequestState::Scanned(ScanOutcome::Blocked))
            .unwrap();
        trace.advance(RequestState::Rejected).unwrap();
        trace.advance(RequestState::Logged).unwrap();
    }

    #[test]
    fn test_blocked_cannot_complete() {
        let mut trace = RequestTrace::new();
        trace.advance(RequestState::Retrieved).unwrap();
        trace.advance(RequestState::PromptBuilt).unwrap();
        trace
            .advance(RequestState::Scanned(ScanOutcome::Blocked))
            .unwrap();

        assert!(trace.advance(RequestState::Completed).is_err());
    }

    #[test]
    fn test_cannot_skip_states() {
        let mut trace = RequestTrace::new();
        assert!(trace.advance(RequestState::Completed).is_err());
        assert!(trace
            .advance(RequestState::Scanned(ScanOutcome::Allowed))
            .is_err());
    }

    #[test]
    fn test_failure_logs_from_any_state() {
        // A retrieval failure logs straight from Received
        let mut trace = RequestTrace::new();
        trace.advance(RequestState::Logged).unwrap();
        assert!(trace.state().is_terminal());
    }

    #[test]
    fn test_logged_is_terminal() {
        let mut trace = RequestTrace::new();
        trace.advance(RequestState::Logged).unwrap();
        assert!(trace.advance(RequestState::Retrieved).is_err());
        assert!(trace.advance(RequestState::Logged).is_err());
    }
}
