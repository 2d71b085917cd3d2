use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{
    DriverStatus, GeoPoint, NewRide, Ride, RideCommand, RideListQuery, RideOutcome, RideStatus,
    RideTransition, Role, SecurityContext,
};
use crate::domain::assignment::AssignmentService;
use crate::domain::error::DomainError;
use crate::domain::geo;
use crate::domain::lifecycle;
use crate::domain::repo::{
    AssignmentStore, DriverPatch, DriversRepository, RideFilter, RidePatch, RidesRepository,
};

/// Cancellation reason recorded on rides closed by `expire_stale_requests`.
pub const EXPIRED_REASON: &str = "expired: no driver assigned";

/// Tunables for the ride and assignment services.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_search_radius_km: f64,
    pub max_search_radius_km: f64,
    pub average_speed_kmh: f64,
    pub max_candidates: usize,
    pub default_page_size: u64,
    pub max_page_size: u64,
    pub max_note_length: usize,
    pub request_ttl_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_search_radius_km: 10.0,
            max_search_radius_km: 50.0,
            average_speed_kmh: 30.0,
            max_candidates: 10,
            default_page_size: 20,
            max_page_size: 100,
            max_note_length: 500,
            request_ttl_secs: 900,
        }
    }
}

/// Ride lifecycle engine.
///
/// Every mutation is a conditional write keyed on the status that was read,
/// so two callers racing on the same ride cannot both win.
#[derive(Clone)]
pub struct RideService {
    rides: Arc<dyn RidesRepository>,
    drivers: Arc<dyn DriversRepository>,
    assignment: AssignmentService,
    config: ServiceConfig,
}

impl RideService {
    pub fn new(
        rides: Arc<dyn RidesRepository>,
        drivers: Arc<dyn DriversRepository>,
        assignments: Arc<dyn AssignmentStore>,
        config: ServiceConfig,
    ) -> Self {
        let assignment = AssignmentService::new(
            rides.clone(),
            drivers.clone(),
            assignments,
            config.clone(),
        );
        Self {
            rides,
            drivers,
            assignment,
            config,
        }
    }

    pub fn assignment(&self) -> &AssignmentService {
        &self.assignment
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Page size after applying the default and the upper bound.
    pub fn effective_limit(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.config.default_page_size)
            .min(self.config.max_page_size)
    }

    #[instrument(
        name = "rides.service.create_ride",
        skip(self, ctx, new_ride),
        fields(caller_id = %ctx.caller_id)
    )]
    pub async fn create_ride(
        &self,
        ctx: &SecurityContext,
        new_ride: NewRide,
    ) -> Result<Ride, DomainError> {
        info!("Creating new ride request");

        if ctx.role != Role::Passenger {
            return Err(DomainError::forbidden("only passengers can request rides"));
        }
        let (pickup, dropoff) = validate_new_ride(&new_ride)?;

        let now = Utc::now();
        let ride = Ride {
            id: Uuid::new_v4(),
            passenger_id: ctx.caller_id,
            driver_id: None,
            status: RideStatus::Requested,
            pickup_address: new_ride.pickup_address.trim().to_string(),
            pickup_location: pickup,
            dropoff_address: new_ride.dropoff_address.trim().to_string(),
            dropoff_location: dropoff,
            distance_km: new_ride.distance_km,
            estimated_duration_min: new_ride.estimated_duration_min,
            fare_estimate: new_ride.fare_estimate,
            fare_final: None,
            surge_multiplier: 1.0,
            passenger_notes: new_ride.passenger_notes,
            driver_notes: None,
            requested_at: now,
            assigned_at: None,
            pickup_at: None,
            dropoff_at: None,
            canceled_at: None,
            canceled_by: None,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.rides
            .insert(ride.clone())
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;

        info!(ride_id = %ride.id, "Ride requested");
        Ok(ride)
    }

    #[instrument(
        name = "rides.service.get_ride",
        skip(self, ctx),
        fields(caller_id = %ctx.caller_id, ride_id = %id)
    )]
    pub async fn get_ride(&self, ctx: &SecurityContext, id: Uuid) -> Result<Ride, DomainError> {
        debug!("Getting ride by id");
        let ride = self.load_ride(id).await?;
        lifecycle::ensure_participant(&ride, ctx)?;
        Ok(ride)
    }

    /// Passengers see their own rides, drivers the rides assigned to them,
    /// admins everything. Newest first.
    #[instrument(
        name = "rides.service.list_rides",
        skip(self, ctx),
        fields(caller_id = %ctx.caller_id)
    )]
    pub async fn list_rides(
        &self,
        ctx: &SecurityContext,
        query: RideListQuery,
    ) -> Result<Vec<Ride>, DomainError> {
        let mut filter = RideFilter {
            status: query.status,
            limit: self.effective_limit(query.limit),
            offset: query.offset.unwrap_or(0),
            ..Default::default()
        };
        match ctx.role {
            Role::Passenger => filter.passenger_id = Some(ctx.caller_id),
            Role::Driver => filter.driver_id = Some(ctx.caller_id),
            Role::Admin => {}
        }

        let rides = self
            .rides
            .list(filter)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        debug!(count = rides.len(), "Listed rides");
        Ok(rides)
    }

    /// Move a ride along the state machine.
    ///
    /// Checks run in a fixed order: existence, participation, edge legality,
    /// per-edge permission, then the conditional write.
    #[instrument(
        name = "rides.service.transition_status",
        skip(self, ctx, transition),
        fields(caller_id = %ctx.caller_id, ride_id = %id, to = %transition.target())
    )]
    pub async fn transition_status(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        transition: RideTransition,
    ) -> Result<RideOutcome, DomainError> {
        let ride = self.load_ride(id).await?;
        lifecycle::ensure_participant(&ride, ctx)?;
        let to = transition.target();
        lifecycle::ensure_transition(ride.status, to)?;
        lifecycle::ensure_may_trigger(&ride, to, ctx)?;

        let now = Utc::now();
        match transition {
            RideTransition::Assign { driver_id } => {
                self.assignment.assign_driver(ctx, id, driver_id).await
            }
            RideTransition::Start => {
                let patch = RidePatch {
                    status: Some(RideStatus::InProgress),
                    pickup_at: Some(now),
                    ..Default::default()
                };
                let ride = self.write(&ride, patch).await?;
                info!("Ride started");
                Ok(RideOutcome {
                    ride,
                    warning: None,
                })
            }
            RideTransition::Complete { fare_final } => {
                if let Some(fare) = fare_final {
                    if !fare.is_finite() || fare < 0.0 {
                        return Err(DomainError::validation(
                            "fare_final",
                            "must be a non-negative number",
                        ));
                    }
                }
                let patch = RidePatch {
                    status: Some(RideStatus::Completed),
                    dropoff_at: Some(now),
                    fare_final,
                    ..Default::default()
                };
                let ride = self.write(&ride, patch).await?;
                info!("Ride completed");

                let earned = ride.fare_final.or(ride.fare_estimate).unwrap_or(0.0);
                let warning = self.release_driver(ride.driver_id, Some(earned)).await;
                Ok(RideOutcome { ride, warning })
            }
            RideTransition::Cancel { reason } => {
                let reason = normalize_reason(reason);
                self.cancel(&ride, Some(ctx.caller_id), reason).await
            }
        }
    }

    /// Cancel a ride on behalf of its passenger or its driver.
    #[instrument(
        name = "rides.service.cancel_ride",
        skip(self, ctx, reason),
        fields(caller_id = %ctx.caller_id, ride_id = %id)
    )]
    pub async fn cancel_ride(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<RideOutcome, DomainError> {
        let ride = self.load_ride(id).await?;
        if !ride.is_participant(ctx.caller_id) {
            return Err(DomainError::forbidden(
                "only the ride's passenger or driver may cancel it",
            ));
        }
        if ride.status.is_terminal() {
            return Err(DomainError::invalid_state(
                ride.status,
                "ride can no longer be canceled",
            ));
        }
        self.cancel(&ride, Some(ctx.caller_id), normalize_reason(reason))
            .await
    }

    #[instrument(
        name = "rides.service.add_driver_note",
        skip(self, ctx, note),
        fields(caller_id = %ctx.caller_id, ride_id = %id)
    )]
    pub async fn add_driver_note(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        note: String,
    ) -> Result<Ride, DomainError> {
        let ride = self.load_ride(id).await?;
        if ride.driver_id != Some(ctx.caller_id) {
            return Err(DomainError::forbidden(
                "only the ride's driver may add driver notes",
            ));
        }
        let note = note.trim();
        if note.is_empty() {
            return Err(DomainError::validation("note", "cannot be empty"));
        }
        if note.chars().count() > self.config.max_note_length {
            return Err(DomainError::validation(
                "note",
                format!("must be at most {} characters", self.config.max_note_length),
            ));
        }

        let patch = RidePatch {
            driver_notes: Some(note.to_string()),
            ..Default::default()
        };
        self.write(&ride, patch).await
    }

    /// Dispatch a closed `RideCommand`.
    pub async fn apply_command(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        command: RideCommand,
    ) -> Result<RideOutcome, DomainError> {
        match command {
            RideCommand::Transition(t) => self.transition_status(ctx, id, t).await,
            RideCommand::AddDriverNote { note } => {
                let ride = self.add_driver_note(ctx, id, note).await?;
                Ok(RideOutcome {
                    ride,
                    warning: None,
                })
            }
        }
    }

    /// Cancel rides that have waited in `requested` longer than the
    /// configured TTL. Returns how many were expired.
    #[instrument(
        name = "rides.service.expire_stale_requests",
        skip(self, ctx),
        fields(caller_id = %ctx.caller_id)
    )]
    pub async fn expire_stale_requests(&self, ctx: &SecurityContext) -> Result<u64, DomainError> {
        if !ctx.is_admin() {
            return Err(DomainError::forbidden("only admins can expire requests"));
        }
        let ttl = i64::try_from(self.config.request_ttl_secs).unwrap_or(i64::MAX);
        let cutoff = Utc::now() - Duration::seconds(ttl);

        let stale = self
            .rides
            .list_requested_before(cutoff)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;

        let mut expired = 0u64;
        for ride in stale {
            let patch = RidePatch {
                status: Some(RideStatus::Canceled),
                canceled_at: Some(Utc::now()),
                canceled_by: Some(None),
                cancellation_reason: Some(Some(EXPIRED_REASON.to_string())),
                ..Default::default()
            };
            let updated = self
                .rides
                .update_conditional(ride.id, RideStatus::Requested, patch)
                .await
                .map_err(|e| DomainError::database(e.to_string()))?;
            match updated {
                Some(_) => expired += 1,
                None => debug!(ride_id = %ride.id, "Ride left requested before expiry"),
            }
        }

        info!(expired, "Expired stale ride requests");
        Ok(expired)
    }

    async fn cancel(
        &self,
        ride: &Ride,
        canceled_by: Option<Uuid>,
        reason: Option<String>,
    ) -> Result<RideOutcome, DomainError> {
        let patch = RidePatch {
            status: Some(RideStatus::Canceled),
            canceled_at: Some(Utc::now()),
            canceled_by: Some(canceled_by),
            cancellation_reason: Some(reason),
            ..Default::default()
        };
        let canceled = self.write(ride, patch).await?;
        info!(ride_id = %canceled.id, "Ride canceled");

        let warning = self.release_driver(canceled.driver_id, None).await;
        Ok(RideOutcome {
            ride: canceled,
            warning,
        })
    }

    /// Conditional write on the status that was read; zero rows is a lost race.
    async fn write(&self, ride: &Ride, patch: RidePatch) -> Result<Ride, DomainError> {
        self.rides
            .update_conditional(ride.id, ride.status, patch)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::conflict("ride was modified concurrently"))
    }

    /// Put the ride's driver back online and available, crediting `earned`
    /// for a completed ride.
    ///
    /// Only a `busy` driver is released; one taken offline meanwhile keeps
    /// its status and is only credited. The ride write already committed, so
    /// a failure here is surfaced as a warning.
    async fn release_driver(&self, driver_id: Option<Uuid>, earned: Option<f64>) -> Option<String> {
        let driver_id = driver_id?;
        let release = DriverPatch {
            credit_completed_ride: earned,
            ..DriverPatch::release()
        };
        let result = match self
            .drivers
            .update_if(driver_id, DriverStatus::Busy, release)
            .await
        {
            Ok(None) => {
                debug!(%driver_id, "driver is not busy; leaving status as is");
                match earned {
                    Some(fare) => {
                        let credit = DriverPatch {
                            credit_completed_ride: Some(fare),
                            ..Default::default()
                        };
                        self.drivers.update(driver_id, credit).await
                    }
                    None => self.drivers.find_by_id(driver_id).await,
                }
            }
            other => other,
        };

        match result {
            Ok(Some(_)) => None,
            Ok(None) => {
                warn!(%driver_id, "driver record missing while releasing driver");
                Some("ride updated, but the driver record could not be found".to_string())
            }
            Err(e) => {
                warn!(%driver_id, error = %e, "failed to release driver");
                Some("ride updated, but the driver's availability could not be updated".to_string())
            }
        }
    }

    async fn load_ride(&self, id: Uuid) -> Result<Ride, DomainError> {
        self.rides
            .find_by_id(id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::ride_not_found(id))
    }
}

fn validate_new_ride(new_ride: &NewRide) -> Result<(GeoPoint, GeoPoint), DomainError> {
    if new_ride.pickup_address.trim().is_empty() {
        return Err(DomainError::validation("pickup_address", "cannot be empty"));
    }
    if new_ride.dropoff_address.trim().is_empty() {
        return Err(DomainError::validation("dropoff_address", "cannot be empty"));
    }
    let pickup = validate_point("pickup_location", new_ride.pickup_location)?;
    let dropoff = validate_point("dropoff_location", new_ride.dropoff_location)?;

    for (field, value) in [
        ("distance_km", new_ride.distance_km),
        ("fare_estimate", new_ride.fare_estimate),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(DomainError::validation(field, "must be a non-negative number"));
            }
        }
    }
    if matches!(new_ride.estimated_duration_min, Some(m) if m < 0) {
        return Err(DomainError::validation(
            "estimated_duration_min",
            "must be a non-negative number",
        ));
    }
    Ok((pickup, dropoff))
}

fn validate_point(field: &str, point: Option<GeoPoint>) -> Result<GeoPoint, DomainError> {
    let point = point.ok_or_else(|| DomainError::validation(field, "is required"))?;
    if !geo::is_valid(point) {
        return Err(DomainError::validation(
            field,
            "latitude must be within [-90, 90] and longitude within [-180, 180]",
        ));
    }
    Ok(point)
}

fn normalize_reason(reason: Option<String>) -> Option<String> {
    reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
}
