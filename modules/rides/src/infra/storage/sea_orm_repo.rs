//! SeaORM-backed implementation of the persistence ports.
//!
//! Generic over `C: ConnectionTrait`, so it can wrap a `DatabaseConnection`
//! or a transaction. Every state change is an `UPDATE ... WHERE` carrying the
//! expected current state; `rows_affected == 0` means the caller lost a race.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::contract::model::{
    AccountStatus, DriverRecord, DriverStatus, Profile, Ride, RideStatus,
};
use crate::domain::geo;
use crate::domain::repo::{
    AssignAttempt, AssignmentStore, DriverPatch, DriversRepository, ProfilesRepository,
    RideFilter, RidePatch, RidesRepository,
};
use crate::infra::storage::entity::{driver, profile, ride};

/// SeaORM repository for rides, drivers and profiles.
/// Holds a connection object; its lifetime/ownership is up to the caller.
pub struct SeaOrmRidesRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmRidesRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    async fn load_ride(&self, id: Uuid) -> anyhow::Result<Option<Ride>> {
        ride::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("load ride failed")?
            .map(Ride::try_from)
            .transpose()
    }

    async fn load_driver(&self, user_id: Uuid) -> anyhow::Result<Option<DriverRecord>> {
        driver::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("load driver failed")?
            .map(DriverRecord::try_from)
            .transpose()
    }

    /// `UPDATE drivers SET .. WHERE user_id = ? [AND status = ?]`.
    async fn patch_driver(
        &self,
        user_id: Uuid,
        expected: Option<DriverStatus>,
        patch: DriverPatch,
    ) -> anyhow::Result<Option<DriverRecord>> {
        let mut update = driver::Entity::update_many().set(driver_changes(&patch));
        if let Some(fare) = patch.credit_completed_ride {
            update = update
                .col_expr(
                    driver::Column::TotalRides,
                    Expr::col(driver::Column::TotalRides).add(1),
                )
                .col_expr(
                    driver::Column::TotalEarnings,
                    Expr::col(driver::Column::TotalEarnings).add(fare),
                );
        }
        update = update.filter(driver::Column::UserId.eq(user_id));
        if let Some(status) = expected {
            update = update.filter(driver::Column::Status.eq(status.as_str()));
        }
        let res = update
            .exec(&self.conn)
            .await
            .context("driver update failed")?;
        if res.rows_affected == 0 {
            return Ok(None);
        }
        self.load_driver(user_id).await
    }

    async fn load_profile(&self, id: Uuid) -> anyhow::Result<Option<Profile>> {
        profile::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("load profile failed")?
            .map(Profile::try_from)
            .transpose()
    }
}

fn ride_changes(patch: RidePatch) -> ride::ActiveModel {
    let mut am = ride::ActiveModel {
        updated_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Some(status) = patch.status {
        am.status = Set(status.as_str().to_string());
    }
    if let Some(driver_id) = patch.driver_id {
        am.driver_id = Set(driver_id);
    }
    if let Some(assigned_at) = patch.assigned_at {
        am.assigned_at = Set(assigned_at);
    }
    if let Some(pickup_at) = patch.pickup_at {
        am.pickup_at = Set(Some(pickup_at));
    }
    if let Some(dropoff_at) = patch.dropoff_at {
        am.dropoff_at = Set(Some(dropoff_at));
    }
    if let Some(fare_final) = patch.fare_final {
        am.fare_final = Set(Some(fare_final));
    }
    if let Some(canceled_at) = patch.canceled_at {
        am.canceled_at = Set(Some(canceled_at));
    }
    if let Some(canceled_by) = patch.canceled_by {
        am.canceled_by = Set(canceled_by);
    }
    if let Some(reason) = patch.cancellation_reason {
        am.cancellation_reason = Set(reason);
    }
    if let Some(notes) = patch.driver_notes {
        am.driver_notes = Set(Some(notes));
    }
    am
}

fn driver_changes(patch: &DriverPatch) -> driver::ActiveModel {
    let now = Utc::now();
    let mut am = driver::ActiveModel {
        updated_at: Set(now),
        ..Default::default()
    };
    if let Some(status) = patch.status {
        am.status = Set(status.as_str().to_string());
    }
    if let Some(available) = patch.is_available {
        am.is_available = Set(available);
    }
    if let Some((location, heading)) = patch.location {
        am.current_location = Set(Some(geo::to_wkt(location)));
        am.current_heading = Set(heading);
        am.last_location_update = Set(Some(now));
    }
    if let Some(v) = patch.documents_verified {
        am.documents_verified = Set(v);
    }
    if let Some(v) = patch.background_check_verified {
        am.background_check_verified = Set(v);
    }
    am
}

#[async_trait]
impl<C> RidesRepository for SeaOrmRidesRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Ride>> {
        self.load_ride(id).await
    }

    async fn insert(&self, r: Ride) -> anyhow::Result<()> {
        let m: ride::ActiveModel = r.into();
        let _ = m.insert(&self.conn).await.context("insert ride failed")?;
        Ok(())
    }

    async fn update_conditional(
        &self,
        id: Uuid,
        expected: RideStatus,
        patch: RidePatch,
    ) -> anyhow::Result<Option<Ride>> {
        let res = ride::Entity::update_many()
            .set(ride_changes(patch))
            .filter(ride::Column::Id.eq(id))
            .filter(ride::Column::Status.eq(expected.as_str()))
            .exec(&self.conn)
            .await
            .context("conditional ride update failed")?;
        if res.rows_affected == 0 {
            return Ok(None);
        }
        self.load_ride(id).await
    }

    async fn list(&self, filter: RideFilter) -> anyhow::Result<Vec<Ride>> {
        let mut query = ride::Entity::find();
        if let Some(passenger_id) = filter.passenger_id {
            query = query.filter(ride::Column::PassengerId.eq(passenger_id));
        }
        if let Some(driver_id) = filter.driver_id {
            query = query.filter(ride::Column::DriverId.eq(driver_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(ride::Column::Status.eq(status.as_str()));
        }
        let rows = query
            .order_by_desc(ride::Column::CreatedAt)
            .limit(filter.limit)
            .offset(filter.offset)
            .all(&self.conn)
            .await
            .context("list rides failed")?;
        rows.into_iter().map(Ride::try_from).collect()
    }

    async fn list_requested_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<Vec<Ride>> {
        let rows = ride::Entity::find()
            .filter(ride::Column::Status.eq(RideStatus::Requested.as_str()))
            .filter(ride::Column::RequestedAt.lt(cutoff))
            .order_by_asc(ride::Column::RequestedAt)
            .all(&self.conn)
            .await
            .context("list stale requests failed")?;
        rows.into_iter().map(Ride::try_from).collect()
    }
}

#[async_trait]
impl<C> DriversRepository for SeaOrmRidesRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, user_id: Uuid) -> anyhow::Result<Option<DriverRecord>> {
        self.load_driver(user_id).await
    }

    async fn insert(&self, d: DriverRecord) -> anyhow::Result<()> {
        let m: driver::ActiveModel = d.into();
        let _ = m.insert(&self.conn).await.context("insert driver failed")?;
        Ok(())
    }

    async fn update(
        &self,
        user_id: Uuid,
        patch: DriverPatch,
    ) -> anyhow::Result<Option<DriverRecord>> {
        self.patch_driver(user_id, None, patch).await
    }

    async fn update_if(
        &self,
        user_id: Uuid,
        expected: DriverStatus,
        patch: DriverPatch,
    ) -> anyhow::Result<Option<DriverRecord>> {
        self.patch_driver(user_id, Some(expected), patch).await
    }

    async fn claim(&self, user_id: Uuid) -> anyhow::Result<Option<DriverRecord>> {
        let patch = DriverPatch {
            status: Some(DriverStatus::Busy),
            is_available: Some(false),
            ..Default::default()
        };
        let res = driver::Entity::update_many()
            .set(driver_changes(&patch))
            .filter(driver::Column::UserId.eq(user_id))
            .filter(driver::Column::Status.eq(DriverStatus::Online.as_str()))
            .filter(driver::Column::IsAvailable.eq(true))
            .exec(&self.conn)
            .await
            .context("driver claim failed")?;
        if res.rows_affected == 0 {
            return Ok(None);
        }
        self.load_driver(user_id).await
    }

    async fn query_available(&self) -> anyhow::Result<Vec<DriverRecord>> {
        let rows = driver::Entity::find()
            .filter(driver::Column::Status.eq(DriverStatus::Online.as_str()))
            .filter(driver::Column::IsAvailable.eq(true))
            .filter(driver::Column::DocumentsVerified.eq(true))
            .filter(driver::Column::BackgroundCheckVerified.eq(true))
            .filter(driver::Column::CurrentLocation.is_not_null())
            .order_by_asc(driver::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("query available drivers failed")?;
        rows.into_iter().map(DriverRecord::try_from).collect()
    }

    async fn list(&self, limit: u64, offset: u64) -> anyhow::Result<Vec<DriverRecord>> {
        let rows = driver::Entity::find()
            .order_by_desc(driver::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await
            .context("list drivers failed")?;
        rows.into_iter().map(DriverRecord::try_from).collect()
    }
}

#[async_trait]
impl<C> AssignmentStore for SeaOrmRidesRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn assign(
        &self,
        ride_id: Uuid,
        driver_id: Uuid,
        assigned_at: DateTime<Utc>,
    ) -> anyhow::Result<AssignAttempt> {
        let txn = self
            .conn
            .begin()
            .await
            .context("begin assignment transaction failed")?;
        let scoped = SeaOrmRidesRepository::new(txn);

        let patch = RidePatch {
            status: Some(RideStatus::Assigned),
            driver_id: Some(Some(driver_id)),
            assigned_at: Some(Some(assigned_at)),
            ..Default::default()
        };
        let attempt =
            match RidesRepository::update_conditional(&scoped, ride_id, RideStatus::Requested, patch)
                .await?
            {
                None => AssignAttempt::RideTaken,
                Some(ride) => match DriversRepository::claim(&scoped, driver_id).await? {
                    None => AssignAttempt::DriverTaken,
                    Some(_) => AssignAttempt::Assigned(ride),
                },
            };

        if matches!(attempt, AssignAttempt::Assigned(_)) {
            scoped
                .conn
                .commit()
                .await
                .context("commit assignment failed")?;
        } else {
            scoped
                .conn
                .rollback()
                .await
                .context("rollback assignment failed")?;
        }
        Ok(attempt)
    }
}

#[async_trait]
impl<C> ProfilesRepository for SeaOrmRidesRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Profile>> {
        self.load_profile(id).await
    }

    async fn insert(&self, p: Profile) -> anyhow::Result<()> {
        let m: profile::ActiveModel = p.into();
        let _ = m.insert(&self.conn).await.context("insert profile failed")?;
        Ok(())
    }

    async fn set_account_status(
        &self,
        id: Uuid,
        status: AccountStatus,
    ) -> anyhow::Result<Option<Profile>> {
        let am = profile::ActiveModel {
            account_status: Set(status.as_str().to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        let res = profile::Entity::update_many()
            .set(am)
            .filter(profile::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("set account status failed")?;
        if res.rows_affected == 0 {
            return Ok(None);
        }
        self.load_profile(id).await
    }
}
