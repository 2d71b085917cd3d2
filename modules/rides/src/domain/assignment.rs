//! Driver search and race-safe assignment.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{
    DriverCandidate, DriverStatus, GeoPoint, Ride, RideOutcome, RideStatus, Role,
    SecurityContext,
};
use crate::domain::error::DomainError;
use crate::domain::geo;
use crate::domain::repo::{AssignAttempt, AssignmentStore, DriversRepository, RidesRepository};
use crate::domain::service::ServiceConfig;

/// Finds eligible drivers and performs assignments.
///
/// Every read goes to the repositories; nothing about rides or drivers is
/// cached between calls.
#[derive(Clone)]
pub struct AssignmentService {
    rides: Arc<dyn RidesRepository>,
    drivers: Arc<dyn DriversRepository>,
    store: Arc<dyn AssignmentStore>,
    config: ServiceConfig,
}

impl AssignmentService {
    pub fn new(
        rides: Arc<dyn RidesRepository>,
        drivers: Arc<dyn DriversRepository>,
        store: Arc<dyn AssignmentStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            rides,
            drivers,
            store,
            config,
        }
    }

    /// Drivers within `radius_km` of `pickup`, nearest first.
    ///
    /// Equal distances keep the repository's insertion order.
    #[instrument(
        name = "rides.assignment.search_available_drivers",
        skip(self, ctx),
        fields(caller_id = %ctx.caller_id)
    )]
    pub async fn search_available_drivers(
        &self,
        ctx: &SecurityContext,
        pickup: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Vec<DriverCandidate>, DomainError> {
        if !matches!(ctx.role, Role::Passenger | Role::Admin) {
            return Err(DomainError::forbidden(
                "only passengers can search for drivers",
            ));
        }
        if !geo::is_valid(pickup) {
            return Err(DomainError::validation(
                "pickup_location",
                "latitude must be within [-90, 90] and longitude within [-180, 180]",
            ));
        }
        let radius = radius_km.unwrap_or(self.config.default_search_radius_km);
        if !radius.is_finite() || radius <= 0.0 || radius > self.config.max_search_radius_km {
            return Err(DomainError::validation(
                "radius",
                format!(
                    "must be greater than 0 and at most {} km",
                    self.config.max_search_radius_km
                ),
            ));
        }

        let drivers = self
            .drivers
            .query_available()
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        debug!(pool = drivers.len(), radius, "filtering available drivers");

        let mut candidates: Vec<DriverCandidate> = drivers
            .into_iter()
            .filter_map(|driver| {
                let location = driver.current_location?;
                let distance_km = geo::haversine_km(pickup, location);
                (distance_km <= radius).then(|| DriverCandidate {
                    estimated_arrival_minutes: geo::eta_minutes(
                        distance_km,
                        self.config.average_speed_kmh,
                    ),
                    distance_km,
                    location,
                    driver,
                })
            })
            .collect();

        // sort_by is stable: ties stay in insertion order
        candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        candidates.truncate(self.config.max_candidates);
        for c in &mut candidates {
            c.distance_km = geo::round_km(c.distance_km);
        }

        info!(found = candidates.len(), "driver search finished");
        Ok(candidates)
    }

    /// Assign `driver_id` to a requested ride.
    ///
    /// The reads up front only pick the error to report. The ride update
    /// (still `requested`) and the driver claim (still online and available)
    /// commit together through the `AssignmentStore`; losing either race
    /// yields `Conflict` and leaves both records untouched.
    #[instrument(
        name = "rides.assignment.assign_driver",
        skip(self, ctx),
        fields(caller_id = %ctx.caller_id, ride_id = %ride_id, driver_id = %driver_id)
    )]
    pub async fn assign_driver(
        &self,
        ctx: &SecurityContext,
        ride_id: Uuid,
        driver_id: Uuid,
    ) -> Result<RideOutcome, DomainError> {
        info!("Assigning driver to ride");

        let ride = self.load_ride(ride_id).await?;
        if !(ctx.is_admin() || ride.passenger_id == ctx.caller_id) {
            return Err(DomainError::forbidden(
                "only the ride's passenger or an admin may assign a driver",
            ));
        }
        match ride.status {
            RideStatus::Requested => {}
            RideStatus::Assigned => return Err(DomainError::conflict("ride already assigned")),
            other => {
                return Err(DomainError::invalid_state(
                    other,
                    "ride cannot be assigned",
                ))
            }
        }

        let driver = self
            .drivers
            .find_by_id(driver_id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::driver_not_found(driver_id))?;
        if driver.status != DriverStatus::Online || !driver.is_available {
            return Err(DomainError::driver_unavailable(driver_id));
        }
        if !driver.is_verified() {
            return Err(DomainError::driver_not_verified(driver_id));
        }

        let attempt = self
            .store
            .assign(ride_id, driver_id, Utc::now())
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        match attempt {
            AssignAttempt::Assigned(ride) => {
                info!("Driver assigned");
                Ok(RideOutcome {
                    ride,
                    warning: None,
                })
            }
            AssignAttempt::RideTaken => {
                debug!("ride left requested before the assignment committed");
                Err(DomainError::conflict("ride already assigned"))
            }
            AssignAttempt::DriverTaken => {
                debug!("driver was claimed by another ride");
                Err(DomainError::conflict("driver is no longer available"))
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
