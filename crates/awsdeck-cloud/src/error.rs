//! Cloud provider error types

use thiserror::Error;

/// Errors surfaced by providers, the inventory and the orchestrator
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Credential file missing: {0}")]
    CredentialMissing(String),

    #[error("Resource is not running: {0}")]
    NotRunning(String),

    #[error("No public address assigned: {0}")]
    AddressMissing(String),

    #[error("Operation {operation_id} timed out after {polls} status checks")]
    OperationTimedOut { operation_id: String, polls: u32 },

    #[error("Operation {operation_id} failed: {reason}")]
    OperationFailed {
        operation_id: String,
        reason: String,
    },

    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: String,
        capability: &'static str,
    },

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CloudError {
    /// Whether the user can fix the condition and retry.
    ///
    /// Recoverable errors are rendered as warnings rather than failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CloudError::QuotaExceeded(_)
                | CloudError::InvalidState(_)
                | CloudError::NotRunning(_)
                | CloudError::AddressMissing(_)
                | CloudError::CredentialMissing(_)
                | CloudError::InvalidInput(_)
        )
    }

    pub fn unsupported(provider: impl Into<String>, capability: &'static str) -> Self {
        CloudError::Unsupported {
            provider: provider.into(),
            capability,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(CloudError::QuotaExceeded("eip".into()).is_recoverable());
        assert!(CloudError::InvalidState("stopped".into()).is_recoverable());
        assert!(!CloudError::ProviderUnavailable("timeout".into()).is_recoverable());
        assert!(
            !CloudError::OperationTimedOut {
                operation_id: "op-1".into(),
                polls: 3
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = CloudError::OperationTimedOut {
            operation_id: "op-1".into(),
            polls: 60,
        };
        assert_eq!(
            err.to_string(),
            "Operation op-1 timed out after 60 status checks"
        );
    }
}
