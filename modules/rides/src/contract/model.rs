use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Passenger,
    Driver,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    Active,
    PendingVerification,
    Suspended,
    Banned,
}

impl AccountStatus {
    /// Suspended and banned accounts may not act at all.
    pub fn may_act(self) -> bool {
        matches!(self, Self::Active | Self::PendingVerification)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RideStatus {
    Requested,
    Assigned,
    InProgress,
    Completed,
    Canceled,
}

impl RideStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverStatus {
    Offline,
    Online,
    Busy,
}

/// Error for parsing persisted/enumerated string values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $s,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(Role, "role", {
    Passenger => "passenger",
    Driver => "driver",
    Admin => "admin",
});

string_enum!(AccountStatus, "account status", {
    Active => "active",
    PendingVerification => "pending_verification",
    Suspended => "suspended",
    Banned => "banned",
});

string_enum!(RideStatus, "ride status", {
    Requested => "requested",
    Assigned => "assigned",
    InProgress => "in_progress",
    Completed => "completed",
    Canceled => "canceled",
});

string_enum!(DriverStatus, "driver status", {
    Offline => "offline",
    Online => "online",
    Busy => "busy",
});

/// Resolved identity of the caller, supplied by the authentication layer.
/// Role and account status always come from the stored profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityContext {
    pub caller_id: Uuid,
    pub role: Role,
    pub account_status: AccountStatus,
}

impl SecurityContext {
    pub fn new(caller_id: Uuid, role: Role, account_status: AccountStatus) -> Self {
        Self {
            caller_id,
            role,
            account_status,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub role: Role,
    pub account_status: AccountStatus,
    pub full_name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn security_context(&self) -> SecurityContext {
        SecurityContext::new(self.id, self.role, self.account_status)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vehicle {
    pub make: Option<String>,
    pub model: Option<String>,
    pub color: Option<String>,
    pub plate: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverRecord {
    pub user_id: Uuid,
    pub status: DriverStatus,
    pub is_available: bool,
    pub documents_verified: bool,
    pub background_check_verified: bool,
    pub current_location: Option<GeoPoint>,
    pub current_heading: Option<f64>,
    pub last_location_update: Option<DateTime<Utc>>,
    pub rating: f64,
    pub total_rides: i32,
    pub total_earnings: f64,
    pub vehicle: Vehicle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DriverRecord {
    pub fn is_verified(&self) -> bool {
        self.documents_verified && self.background_check_verified
    }

    /// Online, available and verified.
    pub fn is_assignable(&self) -> bool {
        self.status == DriverStatus::Online && self.is_available && self.is_verified()
    }
}

/// What riders and other non-owners may see of a driver.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicDriver {
    pub user_id: Uuid,
    pub full_name: String,
    pub rating: f64,
    pub total_rides: i32,
    pub vehicle: Vehicle,
    pub status: DriverStatus,
}

/// A driver as seen by a particular caller: admins and the driver get the
/// full record, everyone else the public projection.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverView {
    Full(DriverRecord),
    Public(PublicDriver),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ride {
    pub id: Uuid,
    pub passenger_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub status: RideStatus,
    pub pickup_address: String,
    pub pickup_location: GeoPoint,
    pub dropoff_address: String,
    pub dropoff_location: GeoPoint,
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

impl Ride {
    /// True if `user_id` is this ride's passenger or current driver.
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.passenger_id == user_id || self.driver_id == Some(user_id)
    }
}

/// Data for requesting a new ride
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewRide {
    pub pickup_address: String,
    pub pickup_location: Option<GeoPoint>,
    pub dropoff_address: String,
    pub dropoff_location: Option<GeoPoint>,
    pub distance_km: Option<f64>,
    pub estimated_duration_min: Option<i32>,
    pub fare_estimate: Option<f64>,
    pub passenger_notes: Option<String>,
}

/// Target of a status change requested through the lifecycle engine.
#[derive(Debug, Clone, PartialEq)]
pub enum RideTransition {
    Assign { driver_id: Uuid },
    Start,
    Complete { fare_final: Option<f64> },
    Cancel { reason: Option<String> },
}

impl RideTransition {
    pub fn target(&self) -> RideStatus {
        match self {
            Self::Assign { .. } => RideStatus::Assigned,
            Self::Start => RideStatus::InProgress,
            Self::Complete { .. } => RideStatus::Completed,
            Self::Cancel { .. } => RideStatus::Canceled,
        }
    }
}

/// Closed set of ride mutations accepted on `PATCH /rides/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub enum RideCommand {
    Transition(RideTransition),
    AddDriverNote { note: String },
}

/// Closed set of driver self-service mutations accepted on `PUT /driver`.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    SetAvailability { is_available: bool },
    UpdateLocation { location: GeoPoint, heading: Option<f64> },
    GoOnline,
    GoOffline,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RideListQuery {
    pub status: Option<RideStatus>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// A driver eligible for a pickup, with its distance and ETA.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverCandidate {
    pub driver: DriverRecord,
    pub location: GeoPoint,
    pub distance_km: f64,
    pub estimated_arrival_minutes: u32,
}

/// Result of a ride mutation. `warning` is set when the ride write
/// committed but the follow-up driver availability write did not.
#[derive(Debug, Clone, PartialEq)]
pub struct RideOutcome {
    pub ride: Ride,
    pub warning: Option<String>,
}
