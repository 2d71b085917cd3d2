use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    client::RidesApi,
    error::RidesError,
    model::{
        DriverCandidate, GeoPoint, NewRide, Ride, RideListQuery, RideOutcome, RideTransition,
        SecurityContext,
    },
};
use crate::domain::service::RideService;

/// Local implementation of `RidesApi` that delegates to the domain services.
pub struct RidesLocalClient {
    service: RideService,
}

impl RidesLocalClient {
    pub fn new(service: RideService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl RidesApi for RidesLocalClient {
    async fn create_ride(
        &self,
        ctx: &SecurityContext,
        new_ride: NewRide,
    ) -> Result<Ride, RidesError> {
        Ok(self.service.create_ride(ctx, new_ride).await?)
    }

    async fn get_ride(&self, ctx: &SecurityContext, id: Uuid) -> Result<Ride, RidesError> {
        Ok(self.service.get_ride(ctx, id).await?)
    }

    async fn list_rides(
        &self,
        ctx: &SecurityContext,
        query: RideListQuery,
    ) -> Result<Vec<Ride>, RidesError> {
        Ok(self.service.list_rides(ctx, query).await?)
    }

    async fn transition_status(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        transition: RideTransition,
    ) -> Result<RideOutcome, RidesError> {
        Ok(self.service.transition_status(ctx, id, transition).await?)
    }

    async fn cancel_ride(
        &self,
        ctx: &SecurityContext,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<RideOutcome, RidesError> {
        Ok(self.service.cancel_ride(ctx, id, reason).await?)
    }

    async fn search_available_drivers(
        &self,
        ctx: &SecurityContext,
        pickup: GeoPoint,
        radius_km: Option<f64>,
    ) -> Result<Vec<DriverCandidate>, RidesError> {
        Ok(self
            .service
            .assignment()
            .search_available_drivers(ctx, pickup, radius_km)
            .await?)
    }

    async fn assign_driver(
        &self,
        ctx: &SecurityContext,
        ride_id: Uuid,
        driver_id: Uuid,
    ) -> Result<RideOutcome, RidesError> {
        Ok(self
            .service
            .assignment()
            .assign_driver(ctx, ride_id, driver_id)
            .await?)
    }
}
