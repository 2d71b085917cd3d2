//! Ride state machine: which edges exist and who may drive each one.
//!
//! ```text
//! requested ──► assigned ──► in_progress ──► completed
//!     │             │              │
//!     └─────────────┴──────────────┴──────► canceled
//! ```

use crate::contract::model::{Ride, RideStatus, SecurityContext};
use crate::domain::error::DomainError;

/// True if the state machine has an edge `from -> to`.
pub fn can_transition(from: RideStatus, to: RideStatus) -> bool {
    use RideStatus::*;
    matches!(
        (from, to),
        (Requested, Assigned)
            | (Assigned, InProgress)
            | (InProgress, Completed)
            | (Requested | Assigned | InProgress, Canceled)
    )
}

/// Fails with `InvalidTransition` unless `from -> to` is an edge.
pub fn ensure_transition(from: RideStatus, to: RideStatus) -> Result<(), DomainError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(DomainError::invalid_transition(from, to))
    }
}

/// Caller must be the ride's passenger, its current driver, or an admin.
pub fn ensure_participant(ride: &Ride, ctx: &SecurityContext) -> Result<(), DomainError> {
    if ctx.is_admin() || ride.is_participant(ctx.caller_id) {
        Ok(())
    } else {
        Err(DomainError::forbidden("caller is not part of this ride"))
    }
}

/// Who may trigger the (already legal) edge `ride.status -> to`.
pub fn ensure_may_trigger(
    ride: &Ride,
    to: RideStatus,
    ctx: &SecurityContext,
) -> Result<(), DomainError> {
    if ctx.is_admin() {
        return Ok(());
    }
    let is_passenger = ride.passenger_id == ctx.caller_id;
    let is_driver = ride.driver_id == Some(ctx.caller_id);
    let allowed = match to {
        RideStatus::Assigned => is_passenger,
        RideStatus::InProgress | RideStatus::Completed => is_driver,
        RideStatus::Canceled => is_passenger || is_driver,
        RideStatus::Requested => false,
    };
    if allowed {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!(
            "caller may not move this ride to '{to}'"
        )))
    }
}
