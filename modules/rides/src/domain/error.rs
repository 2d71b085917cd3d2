use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::RideStatus;

/// Failures of ride and driver operations. Each variant maps to one
/// HTTP status and one client error code.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Access denied: {message}")]
    Forbidden { message: String },

    #[error("Ride not found: {id}")]
    RideNotFound { id: Uuid },

    #[error("Driver not found: {id}")]
    DriverNotFound { id: Uuid },

    #[error("Profile not found: {id}")]
    ProfileNotFound { id: Uuid },

    #[error("Cannot move ride from '{from}' to '{to}'")]
    InvalidTransition { from: RideStatus, to: RideStatus },

    #[error("{message} (current status: {status})")]
    InvalidState { status: String, message: String },

    #[error("Driver {id} is not available")]
    DriverUnavailable { id: Uuid },

    #[error("Driver {id} is not verified")]
    DriverNotVerified { id: Uuid },

    #[error("{message}")]
    Conflict { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn ride_not_found(id: Uuid) -> Self {
        Self::RideNotFound { id }
    }

    pub fn driver_not_found(id: Uuid) -> Self {
        Self::DriverNotFound { id }
    }

    pub fn profile_not_found(id: Uuid) -> Self {
        Self::ProfileNotFound { id }
    }

    pub fn invalid_transition(from: RideStatus, to: RideStatus) -> Self {
        Self::InvalidTransition { from, to }
    }

    pub fn invalid_state(status: impl ToString, message: impl Into<String>) -> Self {
        Self::InvalidState {
            status: status.to_string(),
            message: message.into(),
        }
    }

    pub fn driver_unavailable(id: Uuid) -> Self {
        Self::DriverUnavailable { id }
    }

    pub fn driver_not_verified(id: Uuid) -> Self {
        Self::DriverNotVerified { id }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Lost-race and dependency failures are worth retrying; everything else
    /// needs different input, credentials or a fresh read.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::DriverUnavailable { .. } | Self::Database { .. }
        )
    }
}
