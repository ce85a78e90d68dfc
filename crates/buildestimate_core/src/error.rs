//! crates/buildestimate_core/src/error.rs
//!
//! The error type returned by the core's business operations.

use crate::domain::ProjectStatus;
use crate::lifecycle::LifecycleAction;
use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Malformed or missing input; shown inline to the acting user.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The actor is not allowed to perform the action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The project is not in the state the action requires.
    #[error("Invalid transition: cannot {action} a project that is '{from}'")]
    InvalidTransition {
        from: ProjectStatus,
        action: LifecycleAction,
    },

    /// The project changed underneath the caller.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Registry error: {0}")]
    Port(PortError),
}

impl From<PortError> for DomainError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(what) => DomainError::NotFound(what),
            PortError::Conflict(what) => DomainError::Conflict(what),
            other => DomainError::Port(other),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
