use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::RidesConfig;
use crate::contract::client::RidesApi;
use crate::domain::drivers::DriverService;
use crate::domain::identity::IdentityService;
use crate::domain::service::{RideService, ServiceConfig};
use crate::gateways::local::RidesLocalClient;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::SeaOrmRidesRepository;

/// The rides module: repositories, domain services and REST routes wired
/// over one database connection.
#[derive(Clone)]
pub struct RidesModule {
    rides: Arc<RideService>,
    drivers: Arc<DriverService>,
    identity: Arc<IdentityService>,
}

impl RidesModule {
    pub fn new(db: DatabaseConnection, cfg: RidesConfig) -> anyhow::Result<Self> {
        info!("Initializing rides module");
        cfg.validate()?;
        debug!(
            "Loaded rides config: default_search_radius_km={}, max_candidates={}, request_ttl_secs={}",
            cfg.default_search_radius_km, cfg.max_candidates, cfg.request_ttl_secs
        );

        // One adapter serves every port
        let repo = Arc::new(SeaOrmRidesRepository::new(db));
        let (default_page_size, max_page_size) = (cfg.default_page_size, cfg.max_page_size);
        let service_config: ServiceConfig = cfg.into();

        Ok(Self {
            rides: Arc::new(RideService::new(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                service_config,
            )),
            drivers: Arc::new(
                DriverService::new(repo.clone(), repo.clone())
                    .with_paging(default_page_size, max_page_size),
            ),
            identity: Arc::new(IdentityService::new(repo)),
        })
    }

    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running rides database migrations");
        Migrator::up(db, None).await?;
        info!("Rides database migrations completed successfully");
        Ok(())
    }

    pub fn ride_service(&self) -> Arc<RideService> {
        self.rides.clone()
    }

    pub fn driver_service(&self) -> Arc<DriverService> {
        self.drivers.clone()
    }

    /// In-process client for other modules.
    pub fn client(&self) -> Arc<dyn RidesApi> {
        Arc::new(RidesLocalClient::new((*self.rides).clone()))
    }

    pub fn register_rest(&self, router: Router) -> Router {
        info!("Registering rides REST routes");
        routes::register_routes(
            router,
            self.rides.clone(),
            self.drivers.clone(),
            self.identity.clone(),
        )
    }
}
