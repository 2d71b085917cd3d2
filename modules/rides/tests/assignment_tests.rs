mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use rides::contract::model::{DriverCommand, DriverRecord, DriverStatus, GeoPoint, RideStatus};
use rides::domain::error::DomainError;
use rides::domain::repo::{
    AssignAttempt, AssignmentStore, DriverPatch, DriversRepository, RidePatch, RidesRepository,
};
use rides::domain::service::{RideService, ServiceConfig};

use common::{north_of, setup, setup_with, Repo, PICKUP};

#[tokio::test]
async fn search_filters_by_radius_and_sorts_by_distance() {
    let env = setup().await;
    let passenger = env.passenger().await;

    let far = env.driver_at(Some(north_of(PICKUP, 8.0))).await;
    let near = env.driver_at(Some(north_of(PICKUP, 0.9))).await;
    let mid = env.driver_at(Some(north_of(PICKUP, 3.0))).await;
    let _outside = env.driver_at(Some(north_of(PICKUP, 12.0))).await;

    let found = env
        .rides
        .assignment()
        .search_available_drivers(&passenger, PICKUP, None)
        .await
        .unwrap();

    let ids: Vec<Uuid> = found.iter().map(|c| c.driver.user_id).collect();
    assert_eq!(ids, vec![near.caller_id, mid.caller_id, far.caller_id]);
    assert!(found.iter().all(|c| c.distance_km <= 10.0));
    assert!(found
        .windows(2)
        .all(|w| w[0].distance_km <= w[1].distance_km));

    // 0.9 km at 30 km/h is 1.8 minutes, rounded up.
    assert_eq!(found[0].estimated_arrival_minutes, 2);
    assert!((found[0].distance_km - 0.9).abs() < 0.01);
}

#[tokio::test]
async fn search_excludes_ineligible_drivers() {
    let env = setup().await;
    let passenger = env.passenger().await;
    let here = Some(north_of(PICKUP, 0.5));

    let eligible = env.driver_at(here).await;
    env.driver_with(here, |d| d.is_available = false).await;
    env.driver_with(here, |d| d.status = DriverStatus::Offline).await;
    env.driver_with(here, |d| d.documents_verified = false).await;
    env.driver_with(here, |d| d.background_check_verified = false)
        .await;
    env.driver_at(None).await;

    let found = env
        .rides
        .assignment()
        .search_available_drivers(&passenger, PICKUP, Some(5.0))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].driver.user_id, eligible.caller_id);
}

#[tokio::test]
async fn search_ties_keep_insertion_order_and_truncate() {
    let env = setup_with(ServiceConfig {
        max_candidates: 2,
        ..Default::default()
    })
    .await;
    let passenger = env.passenger().await;
    let spot = Some(north_of(PICKUP, 2.0));
    let first = env.driver_at(spot).await;
    let second = env.driver_at(spot).await;
    env.driver_at(spot).await;

    let found = env
        .rides
        .assignment()
        .search_available_drivers(&passenger, PICKUP, None)
        .await
        .unwrap();
    let ids: Vec<Uuid> = found.iter().map(|c| c.driver.user_id).collect();
    assert_eq!(ids, vec![first.caller_id, second.caller_id]);
}

#[tokio::test]
async fn search_validates_radius_and_caller() {
    let env = setup().await;
    let passenger = env.passenger().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let svc = env.rides.assignment();

    for radius in [0.0, -1.0, 51.0, f64::NAN] {
        let err = svc
            .search_available_drivers(&passenger, PICKUP, Some(radius))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }), "radius {radius}");
    }

    let err = svc
        .search_available_drivers(&passenger, GeoPoint::new(95.0, 0.0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));

    let err = svc
        .search_available_drivers(&driver, PICKUP, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden { .. }));
}

#[tokio::test]
async fn unavailable_driver_is_rejected_before_any_write() {
    let env = setup().await;
    let passenger = env.passenger().await;
    let offline = env
        .driver_with(Some(PICKUP), |d| {
            d.status = DriverStatus::Offline;
            d.is_available = false;
        })
        .await;
    let unverified = env
        .driver_with(Some(PICKUP), |d| d.documents_verified = false)
        .await;
    let ride = env.request_ride(&passenger).await;
    let svc = env.rides.assignment();

    let err = svc
        .assign_driver(&passenger, ride.id, offline.caller_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::DriverUnavailable { .. }));

    let err = svc
        .assign_driver(&passenger, ride.id, unverified.caller_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::DriverNotVerified { .. }));

    let err = svc
        .assign_driver(&passenger, ride.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::DriverNotFound { .. }));

    let stored = env.rides.get_ride(&passenger, ride.id).await.unwrap();
    assert_eq!(stored.status, RideStatus::Requested);
    assert!(stored.driver_id.is_none());
    assert_eq!(
        env.driver_record(unverified.caller_id).await.status,
        DriverStatus::Online
    );
}

#[tokio::test]
async fn only_the_passenger_or_admin_may_assign() {
    let env = setup().await;
    let owner = env.passenger().await;
    let other = env.passenger().await;
    let admin = env.admin().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let ride = env.request_ride(&owner).await;

    let err = env
        .rides
        .assignment()
        .assign_driver(&other, ride.id, driver.caller_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden { .. }));

    let out = env
        .rides
        .assignment()
        .assign_driver(&admin, ride.id, driver.caller_id)
        .await
        .unwrap();
    assert_eq!(out.ride.status, RideStatus::Assigned);

    let err = env
        .rides
        .assignment()
        .assign_driver(&owner, ride.id, driver.caller_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_assignments_of_one_ride_have_one_winner() {
    let env = setup().await;
    let passenger = env.passenger().await;
    let ride_id = env.request_ride(&passenger).await.id;

    let mut drivers = Vec::new();
    for i in 0..6 {
        drivers.push(env.driver_at(Some(north_of(PICKUP, i as f64))).await);
    }

    let mut handles = Vec::new();
    for d in &drivers {
        let svc = env.rides.clone();
        let driver_id = d.caller_id;
        handles.push(tokio::spawn(async move {
            svc.assignment()
                .assign_driver(&passenger, ride_id, driver_id)
                .await
        }));
    }

    let mut winners = Vec::new();
    for h in handles {
        match h.await.unwrap() {
            Ok(out) => winners.push(out.ride.driver_id),
            Err(e) => assert!(matches!(e, DomainError::Conflict { .. }), "unexpected {e:?}"),
        }
    }
    assert_eq!(winners.len(), 1);

    let stored = env.rides.get_ride(&passenger, ride_id).await.unwrap();
    assert_eq!(stored.status, RideStatus::Assigned);
    assert_eq!(Some(stored.driver_id), winners.first().copied());

    let busy: Vec<_> = {
        let mut v = Vec::new();
        for d in &drivers {
            v.push(env.driver_record(d.caller_id).await.status);
        }
        v
    };
    assert_eq!(busy.iter().filter(|s| **s == DriverStatus::Busy).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_driver_cannot_win_two_rides() {
    let env = setup().await;
    let alice = env.passenger().await;
    let bob = env.passenger().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let ride_a = env.request_ride(&alice).await.id;
    let ride_b = env.request_ride(&bob).await.id;

    let (svc_a, svc_b) = (env.rides.clone(), env.rides.clone());
    let driver_id = driver.caller_id;
    let a = tokio::spawn(async move {
        svc_a
            .assignment()
            .assign_driver(&alice, ride_a, driver_id)
            .await
    });
    let b = tokio::spawn(async move {
        svc_b
            .assignment()
            .assign_driver(&bob, ride_b, driver_id)
            .await
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for r in &results {
        if let Err(e) = r {
            assert!(
                matches!(
                    e,
                    DomainError::Conflict { .. } | DomainError::DriverUnavailable { .. }
                ),
                "unexpected {e:?}"
            );
        }
    }

    // The loser is back in `requested` with no driver.
    let admin = env.admin().await;
    let rides = [
        env.rides.get_ride(&admin, ride_a).await.unwrap(),
        env.rides.get_ride(&admin, ride_b).await.unwrap(),
    ];
    let assigned: Vec<_> = rides
        .iter()
        .filter(|r| r.status == RideStatus::Assigned)
        .collect();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].driver_id, Some(driver_id));
    let waiting: Vec<_> = rides
        .iter()
        .filter(|r| r.status == RideStatus::Requested)
        .collect();
    assert_eq!(waiting.len(), 1);
    assert!(waiting[0].driver_id.is_none());
    assert!(waiting[0].assigned_at.is_none());
}

/// Drivers repository whose writes always fail; reads and the real
/// assignment store still go through.
struct FailingDriverWrites {
    inner: Arc<Repo>,
}

#[async_trait]
impl DriversRepository for FailingDriverWrites {
    async fn find_by_id(&self, user_id: Uuid) -> anyhow::Result<Option<DriverRecord>> {
        DriversRepository::find_by_id(self.inner.as_ref(), user_id).await
    }

    async fn insert(&self, driver: DriverRecord) -> anyhow::Result<()> {
        DriversRepository::insert(self.inner.as_ref(), driver).await
    }

    async fn update(
        &self,
        _user_id: Uuid,
        _patch: DriverPatch,
    ) -> anyhow::Result<Option<DriverRecord>> {
        anyhow::bail!("connection reset by peer")
    }

    async fn update_if(
        &self,
        _user_id: Uuid,
        _expected: DriverStatus,
        _patch: DriverPatch,
    ) -> anyhow::Result<Option<DriverRecord>> {
        anyhow::bail!("connection reset by peer")
    }

    async fn claim(&self, _user_id: Uuid) -> anyhow::Result<Option<DriverRecord>> {
        anyhow::bail!("connection reset by peer")
    }

    async fn query_available(&self) -> anyhow::Result<Vec<DriverRecord>> {
        self.inner.query_available().await
    }

    async fn list(&self, limit: u64, offset: u64) -> anyhow::Result<Vec<DriverRecord>> {
        DriversRepository::list(self.inner.as_ref(), limit, offset).await
    }
}

#[tokio::test]
async fn failed_driver_release_still_cancels_with_a_warning() {
    let env = setup().await;
    let passenger = env.passenger().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let ride = env.request_ride(&passenger).await;

    let flaky = Arc::new(FailingDriverWrites {
        inner: env.repo.clone(),
    });
    let svc = RideService::new(
        env.repo.clone(),
        flaky,
        env.repo.clone(),
        ServiceConfig::default(),
    );

    let out = svc
        .assignment()
        .assign_driver(&passenger, ride.id, driver.caller_id)
        .await
        .unwrap();
    assert_eq!(out.ride.status, RideStatus::Assigned);
    assert!(out.warning.is_none());
    assert_eq!(
        env.driver_record(driver.caller_id).await.status,
        DriverStatus::Busy
    );

    let canceled = svc.cancel_ride(&passenger, ride.id, None).await.unwrap();
    assert_eq!(canceled.ride.status, RideStatus::Canceled);
    let warning = canceled.warning.expect("warning is reported");
    assert!(!warning.contains("connection reset"));
}

/// Assignment store that cannot reach the database.
struct UnreachableStore;

#[async_trait]
impl AssignmentStore for UnreachableStore {
    async fn assign(
        &self,
        _ride_id: Uuid,
        _driver_id: Uuid,
        _assigned_at: DateTime<Utc>,
    ) -> anyhow::Result<AssignAttempt> {
        anyhow::bail!("database is locked")
    }
}

#[tokio::test]
async fn failed_assignment_leaves_ride_and_driver_untouched() {
    let env = setup().await;
    let passenger = env.passenger().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let ride = env.request_ride(&passenger).await;

    let svc = RideService::new(
        env.repo.clone(),
        env.repo.clone(),
        Arc::new(UnreachableStore),
        ServiceConfig::default(),
    );
    let err = svc
        .assignment()
        .assign_driver(&passenger, ride.id, driver.caller_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Database { .. }));

    let stored = env.rides.get_ride(&passenger, ride.id).await.unwrap();
    assert_eq!(stored.status, RideStatus::Requested);
    assert!(stored.driver_id.is_none());
    let d = env.driver_record(driver.caller_id).await;
    assert_eq!(d.status, DriverStatus::Online);
    assert!(d.is_available);
}

/// Commits a passenger cancel on the ride just before the assignment runs,
/// the way a concurrent request would land between the checks and the write.
struct CancelFirst {
    inner: Arc<Repo>,
    canceled_by: Uuid,
}

#[async_trait]
impl AssignmentStore for CancelFirst {
    async fn assign(
        &self,
        ride_id: Uuid,
        driver_id: Uuid,
        assigned_at: DateTime<Utc>,
    ) -> anyhow::Result<AssignAttempt> {
        let cancel = RidePatch {
            status: Some(RideStatus::Canceled),
            canceled_at: Some(Utc::now()),
            canceled_by: Some(Some(self.canceled_by)),
            ..Default::default()
        };
        self.inner
            .update_conditional(ride_id, RideStatus::Requested, cancel)
            .await?;
        self.inner.assign(ride_id, driver_id, assigned_at).await
    }
}

#[tokio::test]
async fn cancel_landing_before_assignment_leaves_driver_free() {
    let env = setup().await;
    let passenger = env.passenger().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let ride = env.request_ride(&passenger).await;

    let svc = RideService::new(
        env.repo.clone(),
        env.repo.clone(),
        Arc::new(CancelFirst {
            inner: env.repo.clone(),
            canceled_by: passenger.caller_id,
        }),
        ServiceConfig::default(),
    );
    let err = svc
        .assignment()
        .assign_driver(&passenger, ride.id, driver.caller_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict { .. }));

    let stored = env.rides.get_ride(&passenger, ride.id).await.unwrap();
    assert_eq!(stored.status, RideStatus::Canceled);
    assert!(stored.driver_id.is_none());

    let d = env.driver_record(driver.caller_id).await;
    assert_eq!(d.status, DriverStatus::Online);
    assert!(d.is_available);
    let off = env
        .drivers
        .update_driver(&driver, DriverCommand::GoOffline)
        .await
        .unwrap();
    assert_eq!(off.status, DriverStatus::Offline);
}

#[tokio::test]
async fn claim_lost_inside_assignment_rolls_the_ride_back() {
    let env = setup().await;
    let alice = env.passenger().await;
    let bob = env.passenger().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let ride_a = env.request_ride(&alice).await;
    let ride_b = env.request_ride(&bob).await;

    env.rides
        .assignment()
        .assign_driver(&alice, ride_a.id, driver.caller_id)
        .await
        .unwrap();

    let attempt =
        AssignmentStore::assign(env.repo.as_ref(), ride_b.id, driver.caller_id, Utc::now())
            .await
            .unwrap();
    assert_eq!(attempt, AssignAttempt::DriverTaken);

    let stored = env.rides.get_ride(&bob, ride_b.id).await.unwrap();
    assert_eq!(stored.status, RideStatus::Requested);
    assert!(stored.driver_id.is_none());
    assert!(stored.assigned_at.is_none());

    // Bob cancels his own ride; Alice's driver stays on her ride.
    let canceled = env.rides.cancel_ride(&bob, ride_b.id, None).await.unwrap();
    assert!(canceled.warning.is_none());
    let d = env.driver_record(driver.caller_id).await;
    assert_eq!(d.status, DriverStatus::Busy);
    assert!(!d.is_available);
}

#[tokio::test]
async fn cancel_does_not_bring_a_rejected_driver_back_online() {
    let env = setup().await;
    let passenger = env.passenger().await;
    let admin = env.admin().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let ride = env.request_ride(&passenger).await;

    env.rides
        .assignment()
        .assign_driver(&passenger, ride.id, driver.caller_id)
        .await
        .unwrap();
    env.drivers
        .review_driver(&admin, driver.caller_id, false)
        .await
        .unwrap();

    let canceled = env
        .rides
        .cancel_ride(&passenger, ride.id, None)
        .await
        .unwrap();
    assert_eq!(canceled.ride.status, RideStatus::Canceled);
    assert!(canceled.warning.is_none());

    let d = env.driver_record(driver.caller_id).await;
    assert_eq!(d.status, DriverStatus::Offline);
    assert!(!d.is_available);
}
