use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{
    AccountStatus, DriverRecord, DriverStatus, GeoPoint, Profile, Ride, RideStatus,
};

/// Field changes applied by a conditional ride update. `None` leaves the
/// column untouched; nested `Option`s allow clearing nullable columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RidePatch {
    pub status: Option<RideStatus>,
    pub driver_id: Option<Option<Uuid>>,
    pub assigned_at: Option<Option<DateTime<Utc>>>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub dropoff_at: Option<DateTime<Utc>>,
    pub fare_final: Option<f64>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub canceled_by: Option<Option<Uuid>>,
    pub cancellation_reason: Option<Option<String>>,
    pub driver_notes: Option<String>,
}

/// Field changes for a driver record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriverPatch {
    pub status: Option<DriverStatus>,
    pub is_available: Option<bool>,
    pub location: Option<(GeoPoint, Option<f64>)>,
    pub documents_verified: Option<bool>,
    pub background_check_verified: Option<bool>,
    /// Count one more completed ride and add the fare to total earnings.
    pub credit_completed_ride: Option<f64>,
}

impl DriverPatch {
    /// Back to online and available after a ride ends.
    pub fn release() -> Self {
        Self {
            status: Some(DriverStatus::Online),
            is_available: Some(true),
            ..Default::default()
        }
    }
}

/// Filter for ride listings. Participant filters are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RideFilter {
    pub passenger_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: Option<RideStatus>,
    pub limit: u64,
    pub offset: u64,
}

/// Persistence port for rides.
/// Object-safe and async-friendly via `async_trait`.
#[async_trait]
pub trait RidesRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Ride>>;
    /// Insert a fully-formed ride; service computes id/timestamps.
    async fn insert(&self, ride: Ride) -> anyhow::Result<()>;
    /// Apply `patch` only if the stored status still equals `expected`.
    /// Returns `None` when no row matched (missing or status moved on).
    async fn update_conditional(
        &self,
        id: Uuid,
        expected: RideStatus,
        patch: RidePatch,
    ) -> anyhow::Result<Option<Ride>>;
    /// Newest first.
    async fn list(&self, filter: RideFilter) -> anyhow::Result<Vec<Ride>>;
    /// Rides still `requested` whose `requested_at` is before `cutoff`.
    async fn list_requested_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<Vec<Ride>>;
}

/// Persistence port for driver records.
#[async_trait]
pub trait DriversRepository: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> anyhow::Result<Option<DriverRecord>>;
    async fn insert(&self, driver: DriverRecord) -> anyhow::Result<()>;
    /// Unconditional update; `None` if the driver does not exist.
    async fn update(
        &self,
        user_id: Uuid,
        patch: DriverPatch,
    ) -> anyhow::Result<Option<DriverRecord>>;
    /// Apply `patch` only if the stored status still equals `expected`.
    /// `None` when no row matched (missing driver or status moved on).
    async fn update_if(
        &self,
        user_id: Uuid,
        expected: DriverStatus,
        patch: DriverPatch,
    ) -> anyhow::Result<Option<DriverRecord>>;
    /// Mark the driver busy/unavailable only if still online and available.
    /// `None` means another assignment got there first (or no such driver).
    async fn claim(&self, user_id: Uuid) -> anyhow::Result<Option<DriverRecord>>;
    /// Online, available, verified drivers with a known location, in
    /// insertion order.
    async fn query_available(&self) -> anyhow::Result<Vec<DriverRecord>>;
    /// Every driver, newest first.
    async fn list(&self, limit: u64, offset: u64) -> anyhow::Result<Vec<DriverRecord>>;
}

/// Result of an atomic assignment attempt. Nothing is written unless the
/// attempt is `Assigned`.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignAttempt {
    Assigned(Ride),
    /// The ride is no longer `requested`.
    RideTaken,
    /// The driver is no longer online and available.
    DriverTaken,
}

/// Assignment as one unit of work: the ride moves from `requested` to
/// `assigned` and the driver is claimed, or neither happens.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn assign(
        &self,
        ride_id: Uuid,
        driver_id: Uuid,
        assigned_at: DateTime<Utc>,
    ) -> anyhow::Result<AssignAttempt>;
}

/// Persistence port for identity profiles.
#[async_trait]
pub trait ProfilesRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Profile>>;
    async fn insert(&self, profile: Profile) -> anyhow::Result<()>;
    async fn set_account_status(
        &self,
        id: Uuid,
        status: AccountStatus,
    ) -> anyhow::Result<Option<Profile>>;
}
