use apikit::{ErrDef, ProblemResponse};

use crate::domain::error::DomainError;

pub const VALIDATION: ErrDef = ErrDef::new(400, "Validation error", "RIDES_VALIDATION");
pub const DRIVER_NOT_VERIFIED: ErrDef =
    ErrDef::new(400, "Driver not verified", "RIDES_DRIVER_NOT_VERIFIED");
pub const UNAUTHENTICATED: ErrDef = ErrDef::new(401, "Unauthorized", "RIDES_UNAUTHENTICATED");
pub const FORBIDDEN: ErrDef = ErrDef::new(403, "Forbidden", "RIDES_FORBIDDEN");
pub const RIDE_NOT_FOUND: ErrDef = ErrDef::new(404, "Ride not found", "RIDES_NOT_FOUND");
pub const DRIVER_NOT_FOUND: ErrDef =
    ErrDef::new(404, "Driver not found", "RIDES_DRIVER_NOT_FOUND");
pub const PROFILE_NOT_FOUND: ErrDef =
    ErrDef::new(404, "Profile not found", "RIDES_PROFILE_NOT_FOUND");
pub const INVALID_TRANSITION: ErrDef =
    ErrDef::new(409, "Invalid transition", "RIDES_INVALID_TRANSITION");
pub const INVALID_STATE: ErrDef = ErrDef::new(409, "Invalid state", "RIDES_INVALID_STATE");
pub const DRIVER_UNAVAILABLE: ErrDef =
    ErrDef::new(409, "Driver unavailable", "RIDES_DRIVER_UNAVAILABLE");
pub const CONFLICT: ErrDef = ErrDef::new(409, "Conflict", "RIDES_CONFLICT");
pub const INTERNAL: ErrDef = ErrDef::new(500, "Internal error", "RIDES_INTERNAL");

/// Map domain error to RFC 9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::Validation { field, message } => {
            VALIDATION.to_response(format!("{field}: {message}"), instance)
        }
        DomainError::DriverNotVerified { .. } => {
            DRIVER_NOT_VERIFIED.to_response("Driver is not verified", instance)
        }
        DomainError::Forbidden { message } => FORBIDDEN.to_response(message.clone(), instance),
        DomainError::RideNotFound { .. } => RIDE_NOT_FOUND.to_response("Ride not found", instance),
        DomainError::DriverNotFound { .. } => {
            DRIVER_NOT_FOUND.to_response("Driver not found", instance)
        }
        DomainError::ProfileNotFound { .. } => {
            PROFILE_NOT_FOUND.to_response("Profile not found", instance)
        }
        DomainError::InvalidTransition { .. } => {
            INVALID_TRANSITION.to_response(e.to_string(), instance)
        }
        DomainError::InvalidState { .. } => INVALID_STATE.to_response(e.to_string(), instance),
        DomainError::DriverUnavailable { .. } => {
            DRIVER_UNAVAILABLE.to_response("Driver is not available", instance)
        }
        DomainError::Conflict { message } => CONFLICT.to_response(
            format!("{message}; refresh and try again"),
            instance,
        ),
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            INTERNAL.to_response("Something went wrong, please try again", instance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::model::RideStatus;
    use uuid::Uuid;

    #[test]
    fn statuses_follow_error_class() {
        let cases = [
            (DomainError::validation("pickup_address", "cannot be empty"), 400),
            (DomainError::driver_not_verified(Uuid::nil()), 400),
            (DomainError::forbidden("nope"), 403),
            (DomainError::ride_not_found(Uuid::nil()), 404),
            (
                DomainError::invalid_transition(RideStatus::Completed, RideStatus::Canceled),
                409,
            ),
            (DomainError::invalid_state(RideStatus::Completed, "done"), 409),
            (DomainError::driver_unavailable(Uuid::nil()), 409),
            (DomainError::conflict("ride already assigned"), 409),
            (DomainError::database("connection reset"), 500),
        ];
        for (err, status) in cases {
            assert_eq!(map_domain_error(&err, "/rides").0.status, status, "{err}");
        }
    }

    #[test]
    fn internals_are_not_leaked() {
        let p = map_domain_error(&DomainError::database("password=hunter2"), "/rides").0;
        assert!(!p.detail.contains("hunter2"));
        assert_eq!(p.error, p.detail);
        assert_eq!(p.code, "RIDES_INTERNAL");
    }

    #[test]
    fn validation_names_the_field() {
        let p = map_domain_error(
            &DomainError::validation("note", "cannot be empty"),
            "/rides/1",
        )
        .0;
        assert_eq!(p.error, "note: cannot be empty");
        assert_eq!(p.instance, "/rides/1");
    }
}
