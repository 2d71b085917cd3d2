//! Driver self-service and admin verification review.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::contract::model::{
    AccountStatus, DriverCommand, DriverRecord, DriverStatus, DriverView, PublicDriver, Role,
    SecurityContext,
};
use crate::domain::error::DomainError;
use crate::domain::geo;
use crate::domain::repo::{DriverPatch, DriversRepository, ProfilesRepository};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Clone)]
pub struct DriverService {
    drivers: Arc<dyn DriversRepository>,
    profiles: Arc<dyn ProfilesRepository>,
    default_page_size: u64,
    max_page_size: u64,
}

impl DriverService {
    pub fn new(drivers: Arc<dyn DriversRepository>, profiles: Arc<dyn ProfilesRepository>) -> Self {
        Self {
            drivers,
            profiles,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    pub fn with_paging(mut self, default_page_size: u64, max_page_size: u64) -> Self {
        self.default_page_size = default_page_size;
        self.max_page_size = max_page_size;
        self
    }

    /// Page size after applying the default and the upper bound.
    pub fn effective_limit(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }

    #[instrument(name = "rides.drivers.get_driver", skip(self, ctx), fields(caller_id = %ctx.caller_id))]
    pub async fn get_driver(&self, ctx: &SecurityContext) -> Result<DriverRecord, DomainError> {
        ensure_driver(ctx)?;
        self.load(ctx.caller_id).await
    }

    /// Look up any driver. Admins and the driver themselves get the full
    /// record; other callers get name, rating, ride count, vehicle and status.
    #[instrument(
        name = "rides.drivers.get_driver_by_id",
        skip(self, ctx),
        fields(caller_id = %ctx.caller_id, driver_id = %driver_id)
    )]
    pub async fn get_driver_by_id(
        &self,
        ctx: &SecurityContext,
        driver_id: Uuid,
    ) -> Result<DriverView, DomainError> {
        let driver = self.load(driver_id).await?;
        if ctx.is_admin() || ctx.caller_id == driver_id {
            return Ok(DriverView::Full(driver));
        }

        let full_name = self
            .profiles
            .find_by_id(driver_id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .map(|p| p.full_name)
            .unwrap_or_default();
        Ok(DriverView::Public(PublicDriver {
            user_id: driver.user_id,
            full_name,
            rating: driver.rating,
            total_rides: driver.total_rides,
            vehicle: driver.vehicle,
            status: driver.status,
        }))
    }

    /// All drivers, newest first. Admin only.
    #[instrument(name = "rides.drivers.list_drivers", skip(self, ctx), fields(caller_id = %ctx.caller_id))]
    pub async fn list_drivers(
        &self,
        ctx: &SecurityContext,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<DriverRecord>, DomainError> {
        if !ctx.is_admin() {
            return Err(DomainError::forbidden("only admins can list drivers"));
        }
        let drivers = self
            .drivers
            .list(self.effective_limit(limit), offset.unwrap_or(0))
            .await
            .map_err(|e| DomainError::database(e.to_string()))?;
        debug!(count = drivers.len(), "Listed drivers");
        Ok(drivers)
    }

    /// Apply a self-service command to the caller's own driver record.
    /// `busy` belongs to the ride engine: availability and online status
    /// cannot be changed while a ride is in flight. Those changes are written
    /// only if the status is still the one read, so a concurrent assignment
    /// turns them into `Conflict`.
    #[instrument(
        name = "rides.drivers.update_driver",
        skip(self, ctx, command),
        fields(caller_id = %ctx.caller_id)
    )]
    pub async fn update_driver(
        &self,
        ctx: &SecurityContext,
        command: DriverCommand,
    ) -> Result<DriverRecord, DomainError> {
        ensure_driver(ctx)?;
        let current = self.load(ctx.caller_id).await?;

        let touches_availability = !matches!(command, DriverCommand::UpdateLocation { .. });
        if touches_availability && current.status == DriverStatus::Busy {
            return Err(DomainError::invalid_state(
                current.status,
                "driver is on a ride",
            ));
        }

        let patch = match command {
            DriverCommand::UpdateLocation { location, heading } => {
                if !geo::is_valid(location) {
                    return Err(DomainError::validation(
                        "location",
                        "latitude must be within [-90, 90] and longitude within [-180, 180]",
                    ));
                }
                if matches!(heading, Some(h) if !(0.0..360.0).contains(&h)) {
                    return Err(DomainError::validation("heading", "must be within [0, 360)"));
                }
                DriverPatch {
                    location: Some((location, heading)),
                    ..Default::default()
                }
            }
            DriverCommand::SetAvailability { is_available } => {
                if is_available && current.status != DriverStatus::Online {
                    return Err(DomainError::invalid_state(
                        current.status,
                        "go online before becoming available",
                    ));
                }
                DriverPatch {
                    is_available: Some(is_available),
                    ..Default::default()
                }
            }
            DriverCommand::GoOnline => DriverPatch::release(),
            DriverCommand::GoOffline => DriverPatch {
                status: Some(DriverStatus::Offline),
                is_available: Some(false),
                ..Default::default()
            },
        };

        let written = if touches_availability {
            self.drivers
                .update_if(ctx.caller_id, current.status, patch)
                .await
        } else {
            self.drivers.update(ctx.caller_id, patch).await
        };
        let updated = written
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| {
                if touches_availability {
                    DomainError::conflict("driver status changed")
                } else {
                    DomainError::driver_not_found(ctx.caller_id)
                }
            })?;
        info!(status = %updated.status, available = updated.is_available, "Driver updated");
        Ok(updated)
    }

    /// Approve or reject a driver's documents and background check.
    #[instrument(
        name = "rides.drivers.review_driver",
        skip(self, ctx),
        fields(caller_id = %ctx.caller_id, driver_id = %driver_id)
    )]
    pub async fn review_driver(
        &self,
        ctx: &SecurityContext,
        driver_id: Uuid,
        approve: bool,
    ) -> Result<DriverRecord, DomainError> {
        if !ctx.is_admin() {
            return Err(DomainError::forbidden("only admins can review drivers"));
        }
        self.load(driver_id).await?;

        let (patch, account_status) = if approve {
            (
                DriverPatch {
                    documents_verified: Some(true),
                    background_check_verified: Some(true),
                    ..Default::default()
                },
                AccountStatus::Active,
            )
        } else {
            (
                DriverPatch {
                    status: Some(DriverStatus::Offline),
                    is_available: Some(false),
                    documents_verified: Some(false),
                    background_check_verified: Some(false),
                    ..Default::default()
                },
                AccountStatus::Suspended,
            )
        };

        let updated = self
            .drivers
            .update(driver_id, patch)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::driver_not_found(driver_id))?;
        self.profiles
            .set_account_status(driver_id, account_status)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::profile_not_found(driver_id))?;

        info!(approve, "Driver reviewed");
        Ok(updated)
    }

    async fn load(&self, user_id: Uuid) -> Result<DriverRecord, DomainError> {
        self.drivers
            .find_by_id(user_id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::driver_not_found(user_id))
    }
}

fn ensure_driver(ctx: &SecurityContext) -> Result<(), DomainError> {
    if ctx.role == Role::Driver {
        Ok(())
    } else {
        Err(DomainError::forbidden("only drivers can manage a driver record"))
    }
}
