#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use rides::contract::model::{
    AccountStatus, DriverRecord, DriverStatus, GeoPoint, NewRide, Profile, Ride, Role,
    SecurityContext, Vehicle,
};
use rides::domain::drivers::DriverService;
use rides::domain::identity::IdentityService;
use rides::domain::repo::{DriversRepository, ProfilesRepository};
use rides::domain::service::{RideService, ServiceConfig};
use rides::infra::storage::migrations::Migrator;
use rides::infra::storage::SeaOrmRidesRepository;

pub type Repo = SeaOrmRidesRepository<DatabaseConnection>;

/// Times Square; the reference pickup for most tests.
pub const PICKUP: GeoPoint = GeoPoint {
    lat: 40.7580,
    lng: -73.9855,
};

pub struct TestEnv {
    pub db: DatabaseConnection,
    pub repo: Arc<Repo>,
    pub rides: RideService,
    pub drivers: DriverService,
    pub identity: IdentityService,
    seeded: std::sync::atomic::AtomicI64,
}

/// Create a fresh test database for each test
pub async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub async fn setup() -> TestEnv {
    setup_with(ServiceConfig::default()).await
}

pub async fn setup_with(config: ServiceConfig) -> TestEnv {
    let db = create_test_db().await;
    let repo = Arc::new(SeaOrmRidesRepository::new(db.clone()));
    TestEnv {
        rides: RideService::new(repo.clone(), repo.clone(), repo.clone(), config),
        drivers: DriverService::new(repo.clone(), repo.clone()),
        identity: IdentityService::new(repo.clone()),
        repo,
        db,
        seeded: std::sync::atomic::AtomicI64::new(0),
    }
}

impl TestEnv {
    /// Strictly increasing timestamps so insertion order is observable.
    fn next_ts(&self) -> DateTime<Utc> {
        let n = self
            .seeded
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Utc::now() - Duration::hours(1) + Duration::seconds(n)
    }

    pub async fn profile(&self, role: Role, status: AccountStatus) -> SecurityContext {
        let now = self.next_ts();
        let profile = Profile {
            id: Uuid::new_v4(),
            role,
            account_status: status,
            full_name: format!("{role} user"),
            phone: None,
            created_at: now,
            updated_at: now,
        };
        ProfilesRepository::insert(self.repo.as_ref(), profile.clone())
            .await
            .expect("insert profile");
        profile.security_context()
    }

    pub async fn passenger(&self) -> SecurityContext {
        self.profile(Role::Passenger, AccountStatus::Active).await
    }

    pub async fn admin(&self) -> SecurityContext {
        self.profile(Role::Admin, AccountStatus::Active).await
    }

    /// An online, available, verified driver at `location`.
    pub async fn driver_at(&self, location: Option<GeoPoint>) -> SecurityContext {
        self.driver_with(location, |_| {}).await
    }

    pub async fn driver_with(
        &self,
        location: Option<GeoPoint>,
        tweak: impl FnOnce(&mut DriverRecord),
    ) -> SecurityContext {
        let ctx = self.profile(Role::Driver, AccountStatus::Active).await;
        let now = self.next_ts();
        let mut record = DriverRecord {
            user_id: ctx.caller_id,
            status: DriverStatus::Online,
            is_available: true,
            documents_verified: true,
            background_check_verified: true,
            current_location: location,
            current_heading: None,
            last_location_update: location.map(|_| now),
            rating: 4.8,
            total_rides: 0,
            total_earnings: 0.0,
            vehicle: Vehicle {
                make: Some("Toyota".into()),
                model: Some("Prius".into()),
                color: Some("Silver".into()),
                plate: Some("RIDE-1".into()),
            },
            created_at: now,
            updated_at: now,
        };
        tweak(&mut record);
        DriversRepository::insert(self.repo.as_ref(), record)
            .await
            .expect("insert driver");
        ctx
    }

    pub async fn driver_record(&self, id: Uuid) -> DriverRecord {
        DriversRepository::find_by_id(self.repo.as_ref(), id)
            .await
            .expect("load driver")
            .expect("driver exists")
    }

    pub async fn request_ride(&self, passenger: &SecurityContext) -> Ride {
        self.rides
            .create_ride(passenger, new_ride())
            .await
            .expect("create ride")
    }
}

pub fn new_ride() -> NewRide {
    NewRide {
        pickup_address: "1560 Broadway, New York".into(),
        pickup_location: Some(PICKUP),
        dropoff_address: "350 5th Ave, New York".into(),
        dropoff_location: Some(GeoPoint::new(40.7484, -73.9857)),
        distance_km: Some(1.1),
        estimated_duration_min: Some(6),
        fare_estimate: Some(12.5),
        passenger_notes: Some("north corner".into()),
    }
}

/// A point `km` kilometres due north of `from`.
pub fn north_of(from: GeoPoint, km: f64) -> GeoPoint {
    GeoPoint::new(from.lat + km / 111.195, from.lng)
}
