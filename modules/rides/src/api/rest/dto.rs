use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::contract::model::{
    DriverCandidate, DriverCommand, DriverRecord, DriverView, GeoPoint, NewRide, PublicDriver,
    Ride, RideCommand, RideOutcome, RideStatus, RideTransition, Vehicle,
};
use crate::domain::error::DomainError;

/// Message returned alongside a successful assignment.
pub const ASSIGNED_MESSAGE: &str = "Driver successfully assigned to ride";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct GeoPointDto {
    pub lat: f64,
    pub lng: f64,
}

impl From<GeoPointDto> for GeoPoint {
    fn from(p: GeoPointDto) -> Self {
        GeoPoint::new(p.lat, p.lng)
    }
}

impl From<GeoPoint> for GeoPointDto {
    fn from(p: GeoPoint) -> Self {
        Self {
            lat: p.lat,
            lng: p.lng,
        }
    }
}

/// REST DTO for ride representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RideDto {
    pub id: Uuid,
    pub passenger_id: Uuid,
    pub driver_id: Option<Uuid>,
    /// One of `requested`, `assigned`, `in_progress`, `completed`, `canceled`.
    pub status: String,
    pub pickup_address: String,
    pub pickup_location: GeoPointDto,
    pub dropoff_address: String,
    pub dropoff_location: GeoPointDto,
    pub distance_km: Option<f64>,
    pub estimated_duration_min: Option<i32>,
    pub fare_estimate: Option<f64>,
    pub fare_final: Option<f64>,
    pub surge_multiplier: f64,
    pub passenger_notes: Option<String>,
    pub driver_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub pickup_at: Option<DateTime<Utc>>,
    pub dropoff_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub canceled_by: Option<Uuid>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Ride> for RideDto {
    fn from(r: Ride) -> Self {
        Self {
            id: r.id,
            passenger_id: r.passenger_id,
            driver_id: r.driver_id,
            status: r.status.to_string(),
            pickup_address: r.pickup_address,
            pickup_location: r.pickup_location.into(),
            dropoff_address: r.dropoff_address,
            dropoff_location: r.dropoff_location.into(),
            distance_km: r.distance_km,
            estimated_duration_min: r.estimated_duration_min,
            fare_estimate: r.fare_estimate,
            fare_final: r.fare_final,
            surge_multiplier: r.surge_multiplier,
            passenger_notes: r.passenger_notes,
            driver_notes: r.driver_notes,
            requested_at: r.requested_at,
            assigned_at: r.assigned_at,
            pickup_at: r.pickup_at,
            dropoff_at: r.dropoff_at,
            canceled_at: r.canceled_at,
            canceled_by: r.canceled_by,
            cancellation_reason: r.cancellation_reason,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// `{ "ride": ..., "warning": ... }`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RideEnvelope {
    pub ride: RideDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<Ride> for RideEnvelope {
    fn from(ride: Ride) -> Self {
        Self {
            ride: ride.into(),
            warning: None,
        }
    }
}

impl From<RideOutcome> for RideEnvelope {
    fn from(o: RideOutcome) -> Self {
        Self {
            ride: o.ride.into(),
            warning: o.warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RideListDto {
    pub rides: Vec<RideDto>,
    pub limit: u64,
    pub offset: u64,
}

/// Missing fields deserialize as empty so they surface as validation errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateRideReq {
    #[serde(default)]
    pub pickup_address: String,
    #[serde(default)]
    pub pickup_location: Option<GeoPointDto>,
    #[serde(default)]
    pub dropoff_address: String,
    #[serde(default)]
    pub dropoff_location: Option<GeoPointDto>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub estimated_duration_min: Option<i32>,
    #[serde(default)]
    pub fare_estimate: Option<f64>,
    #[serde(default)]
    pub passenger_notes: Option<String>,
}

impl From<CreateRideReq> for NewRide {
    fn from(req: CreateRideReq) -> Self {
        Self {
            pickup_address: req.pickup_address,
            pickup_location: req.pickup_location.map(Into::into),
            dropoff_address: req.dropoff_address,
            dropoff_location: req.dropoff_location.map(Into::into),
            distance_km: req.distance_km,
            estimated_duration_min: req.estimated_duration_min,
            fare_estimate: req.fare_estimate,
            passenger_notes: req.passenger_notes,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListRidesQuery {
    /// Filter by ride status.
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Target of a `transition` command.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionReq {
    /// `assigned`, `in_progress`, `completed` or `canceled`.
    pub to: String,
    /// Required when `to` is `assigned`.
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub fare_final: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `PATCH /rides/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RideCommandReq {
    Transition(TransitionReq),
    AddDriverNote { note: String },
}

impl TryFrom<RideCommandReq> for RideCommand {
    type Error = DomainError;

    fn try_from(req: RideCommandReq) -> Result<Self, Self::Error> {
        match req {
            RideCommandReq::AddDriverNote { note } => Ok(RideCommand::AddDriverNote { note }),
            RideCommandReq::Transition(t) => {
                let to: RideStatus = t
                    .to
                    .parse()
                    .map_err(|e: crate::contract::model::ParseEnumError| {
                        DomainError::validation("to", e.to_string())
                    })?;
                let transition = match to {
                    RideStatus::Assigned => RideTransition::Assign {
                        driver_id: t.driver_id.ok_or_else(|| {
                            DomainError::validation("driver_id", "is required to assign a ride")
                        })?,
                    },
                    RideStatus::InProgress => RideTransition::Start,
                    RideStatus::Completed => RideTransition::Complete {
                        fare_final: t.fare_final,
                    },
                    RideStatus::Canceled => RideTransition::Cancel { reason: t.reason },
                    RideStatus::Requested => {
                        return Err(DomainError::validation(
                            "to",
                            "a ride cannot be moved back to 'requested'",
                        ))
                    }
                };
                Ok(RideCommand::Transition(transition))
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CancelRideReq {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct SearchDriversReq {
    #[serde(default)]
    pub pickup_location: Option<GeoPointDto>,
    /// Kilometres; defaults to the configured search radius.
    #[serde(default)]
    pub radius: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VehicleDto {
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub plate: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DriverCandidateDto {
    pub id: Uuid,
    pub rating: f64,
    pub total_rides: i32,
    pub vehicle: VehicleDto,
    pub location: GeoPointDto,
    pub heading: Option<f64>,
    pub distance_km: f64,
    pub estimated_arrival_minutes: u32,
    pub last_location_update: Option<DateTime<Utc>>,
}

impl From<DriverCandidate> for DriverCandidateDto {
    fn from(c: DriverCandidate) -> Self {
        Self {
            id: c.driver.user_id,
            rating: c.driver.rating,
            total_rides: c.driver.total_rides,
            vehicle: c.driver.vehicle.into(),
            location: c.location.into(),
            heading: c.driver.current_heading,
            distance_km: c.distance_km,
            estimated_arrival_minutes: c.estimated_arrival_minutes,
            last_location_update: c.driver.last_location_update,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchDriversResp {
    pub drivers: Vec<DriverCandidateDto>,
    pub search_location: GeoPointDto,
    pub radius_km: f64,
    pub total_found: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AssignDriverReq {
    #[serde(default)]
    pub ride_id: Option<Uuid>,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssignDriverResp {
    pub ride: RideDto,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<RideOutcome> for AssignDriverResp {
    fn from(o: RideOutcome) -> Self {
        Self {
            ride: o.ride.into(),
            message: ASSIGNED_MESSAGE.to_string(),
            warning: o.warning,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DriverDto {
    pub user_id: Uuid,
    pub status: String,
    pub is_available: bool,
    pub documents_verified: bool,
    pub background_check_verified: bool,
    pub current_location: Option<GeoPointDto>,
    pub current_heading: Option<f64>,
    pub last_location_update: Option<DateTime<Utc>>,
    pub rating: f64,
    pub total_rides: i32,
    pub total_earnings: f64,
    pub vehicle: VehicleDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DriverRecord> for DriverDto {
    fn from(d: DriverRecord) -> Self {
        Self {
            user_id: d.user_id,
            status: d.status.to_string(),
            is_available: d.is_available,
            documents_verified: d.documents_verified,
            background_check_verified: d.background_check_verified,
            current_location: d.current_location.map(Into::into),
            current_heading: d.current_heading,
            last_location_update: d.last_location_update,
            rating: d.rating,
            total_rides: d.total_rides,
            total_earnings: d.total_earnings,
            vehicle: d.vehicle.into(),
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

impl From<Vehicle> for VehicleDto {
    fn from(v: Vehicle) -> Self {
        Self {
            make: v.make,
            model: v.model,
            color: v.color,
            plate: v.plate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicDriverDto {
    pub user_id: Uuid,
    pub full_name: String,
    pub rating: f64,
    pub total_rides: i32,
    pub vehicle: VehicleDto,
    pub status: String,
}

impl From<PublicDriver> for PublicDriverDto {
    fn from(d: PublicDriver) -> Self {
        Self {
            user_id: d.user_id,
            full_name: d.full_name,
            rating: d.rating,
            total_rides: d.total_rides,
            vehicle: d.vehicle.into(),
            status: d.status.to_string(),
        }
    }
}

/// `GET /drivers/{id}` body: the full record or the public projection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum DriverViewDto {
    Full(DriverDto),
    Public(PublicDriverDto),
}

impl From<DriverView> for DriverViewDto {
    fn from(v: DriverView) -> Self {
        match v {
            DriverView::Full(d) => Self::Full(d.into()),
            DriverView::Public(p) => Self::Public(p.into()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDriversQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DriverListDto {
    pub drivers: Vec<DriverDto>,
    pub limit: u64,
    pub offset: u64,
}

/// Body of `PUT /driver`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverCommandReq {
    SetAvailability {
        is_available: bool,
    },
    UpdateLocation {
        lat: f64,
        lng: f64,
        #[serde(default)]
        heading: Option<f64>,
    },
    GoOnline,
    GoOffline,
}

impl From<DriverCommandReq> for DriverCommand {
    fn from(req: DriverCommandReq) -> Self {
        match req {
            DriverCommandReq::SetAvailability { is_available } => {
                DriverCommand::SetAvailability { is_available }
            }
            DriverCommandReq::UpdateLocation { lat, lng, heading } => {
                DriverCommand::UpdateLocation {
                    location: GeoPoint::new(lat, lng),
                    heading,
                }
            }
            DriverCommandReq::GoOnline => DriverCommand::GoOnline,
            DriverCommandReq::GoOffline => DriverCommand::GoOffline,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewDriverReq {
    pub approve: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExpireRidesResp {
    pub expired: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthDto {
    pub status: String,
}
