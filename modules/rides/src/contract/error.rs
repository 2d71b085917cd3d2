use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RidesError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The ride's current state does not allow the operation; re-read it.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Lost a race; retry after re-fetching current state.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Internal error")]
    Internal,
}

impl RidesError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Internal)
    }
}

impl From<crate::domain::error::DomainError> for RidesError {
    fn from(e: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match e {
            Validation { .. } | DriverNotVerified { .. } => Self::validation(e.to_string()),
            Forbidden { .. } => Self::forbidden(e.to_string()),
            RideNotFound { .. } | DriverNotFound { .. } | ProfileNotFound { .. } => {
                Self::not_found(e.to_string())
            }
            InvalidTransition { .. } | InvalidState { .. } => Self::invalid_state(e.to_string()),
            Conflict { .. } | DriverUnavailable { .. } => Self::conflict(e.to_string()),
            Database { .. } => Self::Internal,
        }
    }
}
