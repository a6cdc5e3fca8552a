//! Aggregate result of one dispatch

use serde::Serialize;

/// Reason recorded when no transport session is available
pub const NOT_CONNECTED_REASON: &str = "transport session not connected";

/// Error text recorded for recipients skipped after cancellation
pub const CANCELLED_REASON: &str = "cancelled";

/// Overall status of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Every recipient was sent to
    Delivered,
    /// Some recipients failed, at least one succeeded
    PartialFailure,
    /// Every attempted recipient failed
    Failed,
    /// The batch was stopped before all recipients were attempted
    Cancelled,
    /// Nothing was attempted because the transport session was unavailable
    NotConnected,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::PartialFailure => "partial_failure",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::NotConnected => "not_connected",
        }
    }
}

/// A failure to deliver to one recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientFailure {
    pub index: usize,
    pub recipient: String,
    pub error: String,
}

impl RecipientFailure {
    pub fn new(index: usize, recipient: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            index,
            recipient: recipient.into(),
            error: error.into(),
        }
    }
}

impl std::fmt::Display for RecipientFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}: ({})", self.error, self.index, self.recipient)
    }
}

/// The aggregated result of a dispatch
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    status: DispatchStatus,
    failures: Vec<RecipientFailure>,
    /// Reason for a batch-level short-circuit
    #[serde(skip_serializing_if = "Option::is_none")]
    precondition: Option<String>,
    attempted: usize,
    delivered: usize,
}

impl DispatchOutcome {
    /// Outcome for a batch that never started because no session is connected
    pub fn not_connected() -> Self {
        Self {
            status: DispatchStatus::NotConnected,
            failures: Vec::new(),
            precondition: Some(NOT_CONNECTED_REASON.to_string()),
            attempted: 0,
            delivered: 0,
        }
    }

    /// Build the outcome of a batch that entered the recipient loop
    pub fn from_results(
        failures: Vec<RecipientFailure>,
        attempted: usize,
        delivered: usize,
        cancelled: bool,
    ) -> Self {
        let status = if cancelled {
            DispatchStatus::Cancelled
        } else if failures.is_empty() {
            DispatchStatus::Delivered
        } else if delivered == 0 {
            DispatchStatus::Failed
        } else {
            DispatchStatus::PartialFailure
        };

        Self {
            status,
            failures,
            precondition: None,
            attempted,
            delivered,
        }
    }

    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == DispatchStatus::Delivered
    }

    /// True when the batch was stopped before any recipient was attempted
    pub fn is_precondition_failure(&self) -> bool {
        self.precondition.is_some()
    }

    pub fn failures(&self) -> &[RecipientFailure] {
        &self.failures
    }

    /// Recipients whose send ran to completion, delivered or failed. A send
    /// abandoned by cancellation is not counted.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Human-readable reasons, one per failure
    pub fn reasons(&self) -> Vec<String> {
        match &self.precondition {
            Some(reason) => vec![reason.clone()],
            None => self.failures.iter().map(ToString::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_format() {
        let failure = RecipientFailure::new(1, "4915112345678", "server returned error 479");
        assert_eq!(
            failure.to_string(),
            "server returned error 479-1: (4915112345678)"
        );
    }

    #[test]
    fn test_status_selection() {
        let ok = DispatchOutcome::from_results(vec![], 3, 3, false);
        assert_eq!(ok.status(), DispatchStatus::Delivered);
        assert!(ok.is_success());
        assert!(ok.reasons().is_empty());

        let partial =
            DispatchOutcome::from_results(vec![RecipientFailure::new(1, "B", "boom")], 3, 2, false);
        assert_eq!(partial.status(), DispatchStatus::PartialFailure);
        assert_eq!(partial.reasons(), vec!["boom-1: (B)".to_string()]);

        let failed =
            DispatchOutcome::from_results(vec![RecipientFailure::new(0, "A", "boom")], 1, 0, false);
        assert_eq!(failed.status(), DispatchStatus::Failed);

        let cancelled = DispatchOutcome::from_results(vec![], 1, 1, true);
        assert_eq!(cancelled.status(), DispatchStatus::Cancelled);
        assert!(!cancelled.is_success());
    }

    #[test]
    fn test_not_connected() {
        let outcome = DispatchOutcome::not_connected();
        assert!(outcome.is_precondition_failure());
        assert_eq!(outcome.attempted(), 0);
        assert_eq!(outcome.reasons(), vec![NOT_CONNECTED_REASON.to_string()]);
    }
}
