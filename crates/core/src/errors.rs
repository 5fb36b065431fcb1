use thiserror::Error;

use crate::workflow::WorkflowError;

/// Failures raised by the domain layer itself.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

/// Failures crossing the application boundary: domain outcomes plus the
/// infrastructure trouble (database, external collaborators, configuration)
/// an operation can run into along the way.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

/// Coarse classification of an application failure at the interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceErrorKind {
    /// The caller's input or the current state made the operation invalid.
    Rejected,
    /// A dependency did not answer; retrying later may succeed.
    Unavailable,
    /// The service itself is misbehaving.
    Internal,
}

impl InterfaceErrorKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Rejected => "The request could not be processed. Check inputs and try again.",
            Self::Unavailable => "The service is temporarily unavailable. Please retry shortly.",
            Self::Internal => "An unexpected internal error occurred.",
        }
    }
}

/// What a caller outside the process gets to see: a kind, a message safe to
/// show end users, and the correlation id to quote when reporting the
/// problem. The underlying detail stays in the logs.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{} [correlation {correlation_id}]", .kind.user_message())]
pub struct InterfaceError {
    pub kind: InterfaceErrorKind,
    pub correlation_id: String,
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

impl ApplicationError {
    /// Collapse to what the interface layer may expose, stamping the
    /// correlation id the caller can quote back.
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let kind = match self {
            ApplicationError::Domain(_) => InterfaceErrorKind::Rejected,
            ApplicationError::Persistence(_) | ApplicationError::Integration(_) => {
                InterfaceErrorKind::Unavailable
            }
            ApplicationError::Configuration(_) => InterfaceErrorKind::Internal,
        };
        InterfaceError { kind, correlation_id: correlation_id.into() }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceErrorKind};
    use crate::workflow::WorkflowError;

    #[test]
    fn workflow_errors_surface_as_rejected() {
        let interface = ApplicationError::from(DomainError::Workflow(
            WorkflowError::EmptyApproverConfig { request_type_id: "rt-1".to_owned() },
        ))
        .into_interface("req-1");

        assert_eq!(interface.kind, InterfaceErrorKind::Rejected);
        assert_eq!(interface.correlation_id, "req-1");
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn persistence_and_integration_failures_surface_as_unavailable() {
        for error in [
            ApplicationError::Persistence("database lock timeout".to_owned()),
            ApplicationError::Integration("smtp handshake failed".to_owned()),
        ] {
            let interface = error.into_interface("req-2");
            assert_eq!(interface.kind, InterfaceErrorKind::Unavailable);
        }
    }

    #[test]
    fn configuration_failures_surface_as_internal() {
        let interface = ApplicationError::Configuration("invalid smtp settings".to_owned())
            .into_interface("req-3");

        assert_eq!(interface.kind, InterfaceErrorKind::Internal);
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn display_keeps_detail_out_and_correlation_in() {
        let interface =
            ApplicationError::Persistence("disk io error at offset 4096".to_owned())
                .into_interface("corr-9");
        let rendered = interface.to_string();

        assert!(rendered.contains("corr-9"));
        assert!(!rendered.contains("disk io error"));
    }
}
