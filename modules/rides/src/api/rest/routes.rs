use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use utoipa::OpenApi;

use crate::api::rest::{dto, handlers};
use crate::domain::drivers::DriverService;
use crate::domain::identity::IdentityService;
use crate::domain::service::RideService;

#[derive(OpenApi)]
#[openapi(
    info(title = "Rideshare API", description = "Ride lifecycle and driver assignment"),
    paths(
        handlers::create_ride,
        handlers::list_rides,
        handlers::get_ride,
        handlers::update_ride,
        handlers::cancel_ride,
        handlers::search_drivers,
        handlers::assign_driver,
        handlers::get_driver,
        handlers::update_driver,
        handlers::get_driver_by_id,
        handlers::list_drivers,
        handlers::review_driver,
        handlers::expire_rides,
        handlers::health,
    ),
    components(schemas(
        apikit::Problem,
        dto::GeoPointDto,
        dto::RideDto,
        dto::RideEnvelope,
        dto::RideListDto,
        dto::CreateRideReq,
        dto::TransitionReq,
        dto::RideCommandReq,
        dto::CancelRideReq,
        dto::SearchDriversReq,
        dto::SearchDriversResp,
        dto::DriverCandidateDto,
        dto::VehicleDto,
        dto::AssignDriverReq,
        dto::AssignDriverResp,
        dto::DriverDto,
        dto::DriverCommandReq,
        dto::PublicDriverDto,
        dto::DriverViewDto,
        dto::DriverListDto,
        dto::ReviewDriverReq,
        dto::ExpireRidesResp,
        dto::HealthDto,
    )),
    tags(
        (name = "rides", description = "Ride requests and lifecycle"),
        (name = "booking", description = "Driver search and assignment"),
        (name = "driver", description = "Driver self-service"),
        (name = "admin", description = "Administrative operations"),
        (name = "system", description = "Liveness"),
    )
)]
pub struct RidesApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(RidesApiDoc::openapi())
}

/// Mount every rides endpoint on `router` and inject the services handlers
/// extract through `Extension`.
pub fn register_routes(
    router: Router,
    rides: Arc<RideService>,
    drivers: Arc<DriverService>,
    identity: Arc<IdentityService>,
) -> Router {
    router
        .route(
            "/rides",
            post(handlers::create_ride).get(handlers::list_rides),
        )
        .route(
            "/rides/{id}",
            get(handlers::get_ride)
                .patch(handlers::update_ride)
                .delete(handlers::cancel_ride),
        )
        .route("/booking/search-drivers", post(handlers::search_drivers))
        .route("/booking/assign-driver", post(handlers::assign_driver))
        .route(
            "/driver",
            get(handlers::get_driver).put(handlers::update_driver),
        )
        .route("/drivers", get(handlers::list_drivers))
        .route("/drivers/{id}", get(handlers::get_driver_by_id))
        .route(
            "/admin/drivers/{id}/review",
            post(handlers::review_driver),
        )
        .route("/admin/rides/expire", post(handlers::expire_rides))
        .route("/openapi.json", get(openapi_json))
        .route("/health", get(handlers::health))
        .layer(Extension(rides))
        .layer(Extension(drivers))
        .layer(Extension(identity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_path() {
        let doc = RidesApiDoc::openapi();
        for path in [
            "/rides",
            "/rides/{id}",
            "/booking/search-drivers",
            "/booking/assign-driver",
            "/driver",
            "/drivers",
            "/drivers/{id}",
            "/admin/drivers/{id}/review",
            "/admin/rides/expire",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let schemas = doc.components.expect("components").schemas;
        assert!(schemas.contains_key("Problem"));
        assert!(schemas.contains_key("RideCommandReq"));
        assert!(schemas.contains_key("DriverViewDto"));
    }
}
