use std::sync::Arc;

use apikit::{Problem, ProblemResponse};
use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::rest::auth::Caller;
use crate::api::rest::dto::{
    AssignDriverReq, AssignDriverResp, CancelRideReq, CreateRideReq, DriverCandidateDto,
    DriverCommandReq, DriverDto, DriverListDto, DriverViewDto, ExpireRidesResp, HealthDto,
    ListDriversQuery, ListRidesQuery, ReviewDriverReq, RideCommandReq, RideDto, RideEnvelope,
    RideListDto, SearchDriversReq, SearchDriversResp,
};
use crate::api::rest::error::map_domain_error;
use crate::contract::model::{RideCommand, RideListQuery, RideStatus};
use crate::domain::drivers::DriverService;
use crate::domain::error::DomainError;
use crate::domain::service::RideService;

/// Request a new ride
#[utoipa::path(
    post,
    path = "/rides",
    tag = "rides",
    request_body = CreateRideReq,
    responses(
        (status = 201, description = "Ride requested", body = RideEnvelope),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 401, description = "Unauthorized", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem),
    )
)]
pub async fn create_ride(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<RideService>>,
    Json(req_body): Json<CreateRideReq>,
) -> Result<(StatusCode, Json<RideEnvelope>), ProblemResponse> {
    info!("Creating ride for passenger {}", ctx.caller_id);

    match svc.create_ride(&ctx, req_body.into()).await {
        Ok(ride) => Ok((StatusCode::CREATED, Json(ride.into()))),
        Err(e) => {
            error!("Failed to create ride: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// List rides visible to the caller
#[utoipa::path(
    get,
    path = "/rides",
    tag = "rides",
    params(ListRidesQuery),
    responses(
        (status = 200, description = "Rides, newest first", body = RideListDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 401, description = "Unauthorized", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem),
    )
)]
pub async fn list_rides(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<RideService>>,
    Query(query): Query<ListRidesQuery>,
) -> Result<Json<RideListDto>, ProblemResponse> {
    info!("Listing rides with query: {:?}", query);

    let status = match query.status.as_deref() {
        Some(s) => Some(s.parse::<RideStatus>().map_err(|e| {
            map_domain_error(&DomainError::validation("status", e.to_string()), uri.path())
        })?),
        None => None,
    };
    let list_query = RideListQuery {
        status,
        limit: query.limit,
        offset: query.offset,
    };
    let limit = svc.effective_limit(query.limit);

    match svc.list_rides(&ctx, list_query).await {
        Ok(rides) => Ok(Json(RideListDto {
            rides: rides.into_iter().map(RideDto::from).collect(),
            limit,
            offset: query.offset.unwrap_or(0),
        })),
        Err(e) => {
            error!("Failed to list rides: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a ride by id
#[utoipa::path(
    get,
    path = "/rides/{id}",
    tag = "rides",
    params(("id" = Uuid, Path, description = "Ride id")),
    responses(
        (status = 200, description = "Ride found", body = RideEnvelope),
        (status = 401, description = "Unauthorized", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    )
)]
pub async fn get_ride(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<RideService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RideEnvelope>, ProblemResponse> {
    match svc.get_ride(&ctx, id).await {
        Ok(ride) => Ok(Json(ride.into())),
        Err(e) => {
            error!("Failed to get ride {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Apply a status transition or driver note to a ride
#[utoipa::path(
    patch,
    path = "/rides/{id}",
    tag = "rides",
    params(("id" = Uuid, Path, description = "Ride id")),
    request_body = RideCommandReq,
    responses(
        (status = 200, description = "Ride updated", body = RideEnvelope),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
        (status = 409, description = "Conflict", body = Problem),
    )
)]
pub async fn update_ride(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<RideService>>,
    Path(id): Path<Uuid>,
    Json(req_body): Json<RideCommandReq>,
) -> Result<Json<RideEnvelope>, ProblemResponse> {
    info!("Updating ride {} with: {:?}", id, req_body);

    let command =
        RideCommand::try_from(req_body).map_err(|e| map_domain_error(&e, uri.path()))?;

    match svc.apply_command(&ctx, id, command).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => {
            error!("Failed to update ride {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Cancel a ride; the JSON body `{ "reason": ... }` is optional
#[utoipa::path(
    delete,
    path = "/rides/{id}",
    tag = "rides",
    params(("id" = Uuid, Path, description = "Ride id")),
    request_body(content = CancelRideReq, description = "Optional cancellation reason"),
    responses(
        (status = 200, description = "Ride canceled", body = RideEnvelope),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
        (status = 409, description = "Conflict", body = Problem),
    )
)]
pub async fn cancel_ride(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<RideService>>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<RideEnvelope>, ProblemResponse> {
    let req: CancelRideReq = if body.iter().all(u8::is_ascii_whitespace) {
        CancelRideReq::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            map_domain_error(&DomainError::validation("body", e.to_string()), uri.path())
        })?
    };
    info!("Canceling ride {}", id);

    match svc.cancel_ride(&ctx, id, req.reason).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => {
            error!("Failed to cancel ride {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Find available drivers near a pickup point
#[utoipa::path(
    post,
    path = "/booking/search-drivers",
    tag = "booking",
    request_body = SearchDriversReq,
    responses(
        (status = 200, description = "Candidates, nearest first", body = SearchDriversResp),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
    )
)]
pub async fn search_drivers(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<RideService>>,
    Json(req_body): Json<SearchDriversReq>,
) -> Result<Json<SearchDriversResp>, ProblemResponse> {
    let pickup = req_body.pickup_location.ok_or_else(|| {
        map_domain_error(
            &DomainError::validation("pickup_location", "is required"),
            uri.path(),
        )
    })?;
    let radius_km = req_body
        .radius
        .unwrap_or(svc.config().default_search_radius_km);

    match svc
        .assignment()
        .search_available_drivers(&ctx, pickup.into(), Some(radius_km))
        .await
    {
        Ok(candidates) => {
            let drivers: Vec<DriverCandidateDto> =
                candidates.into_iter().map(Into::into).collect();
            Ok(Json(SearchDriversResp {
                total_found: drivers.len(),
                drivers,
                search_location: pickup,
                radius_km,
            }))
        }
        Err(e) => {
            error!("Driver search failed: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Assign a driver to a requested ride
#[utoipa::path(
    post,
    path = "/booking/assign-driver",
    tag = "booking",
    request_body = AssignDriverReq,
    responses(
        (status = 200, description = "Driver assigned", body = AssignDriverResp),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
        (status = 409, description = "Conflict", body = Problem),
    )
)]
pub async fn assign_driver(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<RideService>>,
    Json(req_body): Json<AssignDriverReq>,
) -> Result<Json<AssignDriverResp>, ProblemResponse> {
    let (Some(ride_id), Some(driver_id)) = (req_body.ride_id, req_body.driver_id) else {
        return Err(map_domain_error(
            &DomainError::validation("ride_id", "ride_id and driver_id are required"),
            uri.path(),
        ));
    };

    match svc.assignment().assign_driver(&ctx, ride_id, driver_id).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => {
            error!("Failed to assign driver {} to ride {}: {}", driver_id, ride_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// The caller's own driver record
#[utoipa::path(
    get,
    path = "/driver",
    tag = "driver",
    responses(
        (status = 200, description = "Driver record", body = DriverDto),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    )
)]
pub async fn get_driver(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<DriverService>>,
) -> Result<Json<DriverDto>, ProblemResponse> {
    match svc.get_driver(&ctx).await {
        Ok(driver) => Ok(Json(driver.into())),
        Err(e) => {
            error!("Failed to get driver {}: {}", ctx.caller_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Change availability, location or online status
#[utoipa::path(
    put,
    path = "/driver",
    tag = "driver",
    request_body = DriverCommandReq,
    responses(
        (status = 200, description = "Driver updated", body = DriverDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 409, description = "Conflict", body = Problem),
    )
)]
pub async fn update_driver(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<DriverService>>,
    Json(req_body): Json<DriverCommandReq>,
) -> Result<Json<DriverDto>, ProblemResponse> {
    info!("Updating driver {} with: {:?}", ctx.caller_id, req_body);

    match svc.update_driver(&ctx, req_body.into()).await {
        Ok(driver) => Ok(Json(driver.into())),
        Err(e) => {
            error!("Failed to update driver {}: {}", ctx.caller_id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Look up a driver; non-owners get the public profile only
#[utoipa::path(
    get,
    path = "/drivers/{id}",
    tag = "driver",
    params(("id" = Uuid, Path, description = "Driver user id")),
    responses(
        (status = 200, description = "Driver record or public profile", body = DriverViewDto),
        (status = 401, description = "Unauthorized", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    )
)]
pub async fn get_driver_by_id(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<DriverService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DriverViewDto>, ProblemResponse> {
    match svc.get_driver_by_id(&ctx, id).await {
        Ok(view) => Ok(Json(view.into())),
        Err(e) => {
            error!("Failed to get driver {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// List every driver, newest first
#[utoipa::path(
    get,
    path = "/drivers",
    tag = "admin",
    params(ListDriversQuery),
    responses(
        (status = 200, description = "Drivers, newest first", body = DriverListDto),
        (status = 403, description = "Forbidden", body = Problem),
    )
)]
pub async fn list_drivers(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<DriverService>>,
    Query(query): Query<ListDriversQuery>,
) -> Result<Json<DriverListDto>, ProblemResponse> {
    match svc.list_drivers(&ctx, query.limit, query.offset).await {
        Ok(drivers) => Ok(Json(DriverListDto {
            drivers: drivers.into_iter().map(DriverDto::from).collect(),
            limit: svc.effective_limit(query.limit),
            offset: query.offset.unwrap_or(0),
        })),
        Err(e) => {
            error!("Failed to list drivers: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Approve or reject a driver's verification
#[utoipa::path(
    post,
    path = "/admin/drivers/{id}/review",
    tag = "admin",
    params(("id" = Uuid, Path, description = "Driver user id")),
    request_body = ReviewDriverReq,
    responses(
        (status = 200, description = "Driver reviewed", body = DriverDto),
        (status = 403, description = "Forbidden", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
    )
)]
pub async fn review_driver(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<DriverService>>,
    Path(id): Path<Uuid>,
    Json(req_body): Json<ReviewDriverReq>,
) -> Result<Json<DriverDto>, ProblemResponse> {
    info!("Reviewing driver {} (approve={})", id, req_body.approve);

    match svc.review_driver(&ctx, id, req_body.approve).await {
        Ok(driver) => Ok(Json(driver.into())),
        Err(e) => {
            error!("Failed to review driver {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Cancel requested rides that nobody picked up in time
#[utoipa::path(
    post,
    path = "/admin/rides/expire",
    tag = "admin",
    responses(
        (status = 200, description = "Number of rides expired", body = ExpireRidesResp),
        (status = 403, description = "Forbidden", body = Problem),
    )
)]
pub async fn expire_rides(
    uri: Uri,
    Caller(ctx): Caller,
    Extension(svc): Extension<Arc<RideService>>,
) -> Result<Json<ExpireRidesResp>, ProblemResponse> {
    match svc.expire_stale_requests(&ctx).await {
        Ok(expired) => Ok(Json(ExpireRidesResp { expired })),
        Err(e) => {
            error!("Failed to expire stale requests: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up", body = HealthDto))
)]
pub async fn health() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
    })
}
