use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::error::RidesError;
use crate::contract::model::{
    DriverCandidate, GeoPoint, NewRide, Ride, RideListQuery, RideOutcome, RideTransition,
    SecurityContext,
};

/// Public API of the rides module for in-process consumers.
///
/// Every call carries the caller's resolved `SecurityContext`.
#[async_trait]
pub trait RidesApi: Send + Sync {
    async fn create_ride(&self, ctx: &SecurityContext, new_ride: NewRide)
        -> Result<Ride, RidesError>;

    async fn get_ride(&self, ctx: &SecurityContext, id: Uuid) -> Result<Ride, RidesError>;

    async fn list_rides(
        &self,
        ctx: &SecurityContext,
        query: RideListQuery,
    ) -> Result<Vec<Ride>, RidesError>;

    async fn transition_status(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        transition: RideTransition,
    ) -> Result<RideOutcome, RidesError>;

    async fn cancel_ride(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<RideOutcome, RidesError>;

    async fn search_available_drivers(
        &self,
        ctx: &SecurityContext,
        pickup: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Vec<DriverCandidate>, RidesError>;

    async fn assign_driver(
        &self,
        ctx: &SecurityContext,
        ride_id: Uuid,
        driver_id: Uuid,
    ) -> Result<RideOutcome, RidesError>;
}
