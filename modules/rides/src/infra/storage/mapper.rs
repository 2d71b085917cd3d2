use anyhow::{anyhow, Context};
use sea_orm::Set;

use crate::contract::model::{DriverRecord, Profile, Ride, Vehicle};
use crate::domain::geo;
use crate::infra::storage::entity::{driver, profile, ride};

impl TryFrom<ride::Model> for Ride {
    type Error = anyhow::Error;

    fn try_from(m: ride::Model) -> Result<Self, Self::Error> {
        let pickup_location = geo::parse_wkt(&m.pickup_location)
            .ok_or_else(|| anyhow!("ride {}: bad pickup location '{}'", m.id, m.pickup_location))?;
        let dropoff_location = geo::parse_wkt(&m.dropoff_location).ok_or_else(|| {
            anyhow!("ride {}: bad dropoff location '{}'", m.id, m.dropoff_location)
        })?;
        Ok(Ride {
            id: m.id,
            passenger_id: m.passenger_id,
            driver_id: m.driver_id,
            status: m
                .status
                .parse()
                .with_context(|| format!("ride {}", m.id))?,
            pickup_address: m.pickup_address,
            pickup_location,
            dropoff_address: m.dropoff_address,
            dropoff_location,
            distance_km: m.distance_km,
            estimated_duration_min: m.estimated_duration_min,
            fare_estimate: m.fare_estimate,
            fare_final: m.fare_final,
            surge_multiplier: m.surge_multiplier,
            passenger_notes: m.passenger_notes,
            driver_notes: m.driver_notes,
            requested_at: m.requested_at,
            assigned_at: m.assigned_at,
            pickup_at: m.pickup_at,
            dropoff_at: m.dropoff_at,
            canceled_at: m.canceled_at,
            canceled_by: m.canceled_by,
            cancellation_reason: m.cancellation_reason,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl From<Ride> for ride::ActiveModel {
    fn from(r: Ride) -> Self {
        ride::ActiveModel {
            id: Set(r.id),
            passenger_id: Set(r.passenger_id),
            driver_id: Set(r.driver_id),
            status: Set(r.status.as_str().to_string()),
            pickup_address: Set(r.pickup_address),
            pickup_location: Set(geo::to_wkt(r.pickup_location)),
            dropoff_address: Set(r.dropoff_address),
            dropoff_location: Set(geo::to_wkt(r.dropoff_location)),
            distance_km: Set(r.distance_km),
            estimated_duration_min: Set(r.estimated_duration_min),
            fare_estimate: Set(r.fare_estimate),
            fare_final: Set(r.fare_final),
            surge_multiplier: Set(r.surge_multiplier),
            passenger_notes: Set(r.passenger_notes),
            driver_notes: Set(r.driver_notes),
            requested_at: Set(r.requested_at),
            assigned_at: Set(r.assigned_at),
            pickup_at: Set(r.pickup_at),
            dropoff_at: Set(r.dropoff_at),
            canceled_at: Set(r.canceled_at),
            canceled_by: Set(r.canceled_by),
            cancellation_reason: Set(r.cancellation_reason),
            created_at: Set(r.created_at),
            updated_at: Set(r.updated_at),
        }
    }
}

/// An unparsable stored location reads back as unknown rather than failing
/// the whole row.
impl TryFrom<driver::Model> for DriverRecord {
    type Error = anyhow::Error;

    fn try_from(m: driver::Model) -> Result<Self, Self::Error> {
        let current_location = m.current_location.as_deref().and_then(geo::parse_wkt);
        Ok(DriverRecord {
            user_id: m.user_id,
            status: m
                .status
                .parse()
                .with_context(|| format!("driver {}", m.user_id))?,
            is_available: m.is_available,
            documents_verified: m.documents_verified,
            background_check_verified: m.background_check_verified,
            current_location,
            current_heading: m.current_heading,
            last_location_update: m.last_location_update,
            rating: m.rating,
            total_rides: m.total_rides,
            total_earnings: m.total_earnings,
            vehicle: Vehicle {
                make: m.vehicle_make,
                model: m.vehicle_model,
                color: m.vehicle_color,
                plate: m.vehicle_plate,
            },
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl From<DriverRecord> for driver::ActiveModel {
    fn from(d: DriverRecord) -> Self {
        driver::ActiveModel {
            user_id: Set(d.user_id),
            status: Set(d.status.as_str().to_string()),
            is_available: Set(d.is_available),
            documents_verified: Set(d.documents_verified),
            background_check_verified: Set(d.background_check_verified),
            current_location: Set(d.current_location.map(geo::to_wkt)),
            current_heading: Set(d.current_heading),
            last_location_update: Set(d.last_location_update),
            rating: Set(d.rating),
            total_rides: Set(d.total_rides),
            total_earnings: Set(d.total_earnings),
            vehicle_make: Set(d.vehicle.make),
            vehicle_model: Set(d.vehicle.model),
            vehicle_color: Set(d.vehicle.color),
            vehicle_plate: Set(d.vehicle.plate),
            created_at: Set(d.created_at),
            updated_at: Set(d.updated_at),
        }
    }
}

impl TryFrom<profile::Model> for Profile {
    type Error = anyhow::Error;

    fn try_from(m: profile::Model) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: m.id,
            role: m.role.parse().with_context(|| format!("profile {}", m.id))?,
            account_status: m
                .account_status
                .parse()
                .with_context(|| format!("profile {}", m.id))?,
            full_name: m.full_name,
            phone: m.phone,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

impl From<Profile> for profile::ActiveModel {
    fn from(p: Profile) -> Self {
        profile::ActiveModel {
            id: Set(p.id),
            role: Set(p.role.as_str().to_string()),
            account_status: Set(p.account_status.as_str().to_string()),
            full_name: Set(p.full_name),
            phone: Set(p.phone),
            created_at: Set(p.created_at),
            updated_at: Set(p.updated_at),
        }
    }
}
