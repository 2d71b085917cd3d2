mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use rides::api::rest::auth::USER_ID_HEADER;
use rides::contract::model::{AccountStatus, Role, SecurityContext};
use rides::{RidesConfig, RidesModule};

use common::{setup, TestEnv, PICKUP};

async fn app() -> (TestEnv, Router) {
    let env = setup().await;
    let module = RidesModule::new(env.db.clone(), RidesConfig::default()).unwrap();
    let router = module.register_rest(Router::new());
    (env, router)
}

async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    caller: Option<&SecurityContext>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(ctx) = caller {
        req = req.header(USER_ID_HEADER, ctx.caller_id.to_string());
    }
    let req = match body {
        Some(v) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, content_type, json)
}

fn create_body() -> Value {
    json!({
        "pickup_address": "1560 Broadway, New York",
        "pickup_location": { "lat": PICKUP.lat, "lng": PICKUP.lng },
        "dropoff_address": "350 5th Ave, New York",
        "dropoff_location": { "lat": 40.7484, "lng": -73.9857 },
        "fare_estimate": 12.5
    })
}

#[tokio::test]
async fn missing_or_unknown_caller_is_unauthorized() {
    let (_env, router) = app().await;

    let (status, ct, body) = call(&router, Method::GET, "/rides", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(ct.as_deref(), Some("application/problem+json"));
    assert_eq!(body["error"], "Unauthorized");

    let req = Request::builder()
        .uri("/rides")
        .header(USER_ID_HEADER, Uuid::new_v4().to_string())
        .body(Body::empty())
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/rides")
        .header(USER_ID_HEADER, "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn suspended_caller_is_forbidden() {
    let (env, router) = app().await;
    let suspended = env.profile(Role::Passenger, AccountStatus::Suspended).await;

    let (status, _, body) = call(&router, Method::GET, "/rides", Some(&suspended), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("suspended"));
}

#[tokio::test]
async fn create_get_and_list_rides() {
    let (env, router) = app().await;
    let passenger = env.passenger().await;

    let (status, _, body) = call(
        &router,
        Method::POST,
        "/rides",
        Some(&passenger),
        Some(create_body()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["ride"]["status"], "requested");
    assert_eq!(body["ride"]["passenger_id"], passenger.caller_id.to_string());
    assert!(body.get("warning").is_none());
    let id = body["ride"]["id"].as_str().unwrap().to_owned();

    let (status, _, body) = call(
        &router,
        Method::GET,
        &format!("/rides/{id}"),
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ride"]["id"], id);

    let (status, _, body) = call(
        &router,
        Method::GET,
        "/rides?status=requested&limit=5",
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rides"].as_array().unwrap().len(), 1);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["offset"], 0);

    let (status, _, body) = call(
        &router,
        Method::GET,
        "/rides?status=lost",
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn invalid_create_is_a_problem_response() {
    let (env, router) = app().await;
    let passenger = env.passenger().await;

    let (status, ct, body) = call(
        &router,
        Method::POST,
        "/rides",
        Some(&passenger),
        Some(json!({ "pickup_address": "somewhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(ct.as_deref(), Some("application/problem+json"));
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());
    assert_eq!(body["instance"], "/rides");
}

#[tokio::test]
async fn unknown_ride_is_not_found() {
    let (env, router) = app().await;
    let passenger = env.passenger().await;

    let (status, _, body) = call(
        &router,
        Method::GET,
        &format!("/rides/{}", Uuid::new_v4()),
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn search_and_assign_over_http() {
    let (env, router) = app().await;
    let passenger = env.passenger().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let ride = env.request_ride(&passenger).await;

    let (status, _, body) = call(
        &router,
        Method::POST,
        "/booking/search-drivers",
        Some(&passenger),
        Some(json!({ "pickup_location": { "lat": PICKUP.lat, "lng": PICKUP.lng } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_found"], 1);
    assert_eq!(body["radius_km"], 10.0);
    assert_eq!(body["drivers"][0]["id"], driver.caller_id.to_string());
    assert_eq!(body["drivers"][0]["distance_km"], 0.0);

    let (status, _, body) = call(
        &router,
        Method::POST,
        "/booking/search-drivers",
        Some(&passenger),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let assign = json!({ "ride_id": ride.id, "driver_id": driver.caller_id });
    let (status, _, body) = call(
        &router,
        Method::POST,
        "/booking/assign-driver",
        Some(&passenger),
        Some(assign.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Driver successfully assigned to ride");
    assert_eq!(body["ride"]["status"], "assigned");
    assert_eq!(body["ride"]["driver_id"], driver.caller_id.to_string());

    // Second attempt: the ride is no longer requested.
    let (status, _, body) = call(
        &router,
        Method::POST,
        "/booking/assign-driver",
        Some(&passenger),
        Some(assign),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, _, _) = call(
        &router,
        Method::POST,
        "/booking/assign-driver",
        Some(&passenger),
        Some(json!({ "ride_id": ride.id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn driver_drives_the_ride_through_patch() {
    let (env, router) = app().await;
    let passenger = env.passenger().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let ride = env.request_ride(&passenger).await;
    let uri = format!("/rides/{}", ride.id);

    let (status, _, body) = call(
        &router,
        Method::PATCH,
        &uri,
        Some(&passenger),
        Some(json!({ "type": "transition", "to": "assigned", "driver_id": driver.caller_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ride"]["status"], "assigned");

    // Skipping in_progress is rejected.
    let (status, _, _) = call(
        &router,
        Method::PATCH,
        &uri,
        Some(&driver),
        Some(json!({ "type": "transition", "to": "completed", "fare_final": 15.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, body) = call(
        &router,
        Method::PATCH,
        &uri,
        Some(&driver),
        Some(json!({ "type": "add_driver_note", "note": "at the north entrance" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ride"]["driver_notes"], "at the north entrance");

    for (to, expected) in [("in_progress", "in_progress"), ("completed", "completed")] {
        let (status, _, body) = call(
            &router,
            Method::PATCH,
            &uri,
            Some(&driver),
            Some(json!({ "type": "transition", "to": to, "fare_final": 15.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{to}");
        assert_eq!(body["ride"]["status"], expected);
    }

    let (status, _, body) = call(&router, Method::GET, "/driver", Some(&driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");
    assert_eq!(body["is_available"], true);
    assert_eq!(body["total_rides"], 1);
    assert_eq!(body["total_earnings"], 15.0);

    let (status, _, _) = call(
        &router,
        Method::PATCH,
        &uri,
        Some(&passenger),
        Some(json!({ "type": "transition", "to": "requested" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_with_and_without_body() {
    let (env, router) = app().await;
    let passenger = env.passenger().await;
    let first = env.request_ride(&passenger).await;
    let second = env.request_ride(&passenger).await;

    let (status, _, body) = call(
        &router,
        Method::DELETE,
        &format!("/rides/{}", first.id),
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ride"]["status"], "canceled");
    assert_eq!(body["ride"]["canceled_by"], passenger.caller_id.to_string());

    let (status, _, body) = call(
        &router,
        Method::DELETE,
        &format!("/rides/{}", second.id),
        Some(&passenger),
        Some(json!({ "reason": "plans changed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ride"]["cancellation_reason"], "plans changed");

    // Already terminal.
    let (status, _, _) = call(
        &router,
        Method::DELETE,
        &format!("/rides/{}", second.id),
        Some(&passenger),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn driver_self_service_and_admin_review() {
    let (env, router) = app().await;
    let admin = env.admin().await;
    let passenger = env.passenger().await;
    let driver = env.driver_at(None).await;

    let (status, _, body) = call(
        &router,
        Method::PUT,
        "/driver",
        Some(&driver),
        Some(json!({ "type": "update_location", "lat": 40.75, "lng": -73.99, "heading": 45.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_location"]["lat"], 40.75);
    assert_eq!(body["current_heading"], 45.0);

    let (status, _, body) = call(
        &router,
        Method::PUT,
        "/driver",
        Some(&driver),
        Some(json!({ "type": "go_offline" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "offline");

    let (status, _, _) = call(&router, Method::GET, "/driver", Some(&passenger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let review_uri = format!("/admin/drivers/{}/review", driver.caller_id);
    let (status, _, _) = call(
        &router,
        Method::POST,
        &review_uri,
        Some(&passenger),
        Some(json!({ "approve": false })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = call(
        &router,
        Method::POST,
        &review_uri,
        Some(&admin),
        Some(json!({ "approve": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents_verified"], false);

    // The rejected driver's account is now suspended.
    let (status, _, _) = call(&router, Method::GET, "/driver", Some(&driver), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = call(
        &router,
        Method::POST,
        "/admin/rides/expire",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expired"], 0);
}

#[tokio::test]
async fn driver_lookup_and_listing_over_http() {
    let (env, router) = app().await;
    let admin = env.admin().await;
    let passenger = env.passenger().await;
    let driver = env.driver_at(Some(PICKUP)).await;
    let uri = format!("/drivers/{}", driver.caller_id);

    let (status, _, body) = call(&router, Method::GET, &uri, Some(&passenger), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], driver.caller_id.to_string());
    assert_eq!(body["status"], "online");
    assert_eq!(body["vehicle"]["plate"], "RIDE-1");
    assert!(body["full_name"].is_string());
    assert!(body.get("current_location").is_none());
    assert!(body.get("total_earnings").is_none());

    let (status, _, body) = call(&router, Method::GET, &uri, Some(&driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_location"]["lat"], PICKUP.lat);

    let (status, _, _) = call(&router, Method::GET, "/drivers", Some(&passenger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) =
        call(&router, Method::GET, "/drivers?limit=5", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["drivers"].as_array().map(Vec::len), Some(1));

    let missing = format!("/drivers/{}", Uuid::new_v4());
    let (status, _, _) = call(&router, Method::GET, &missing, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_openapi_need_no_caller() {
    let (_env, router) = app().await;

    let (status, _, body) = call(&router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _, body) = call(&router, Method::GET, "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/booking/assign-driver"].is_object());
    assert!(body["paths"]["/drivers/{id}"].is_object());
    assert!(body["components"]["schemas"]["Problem"].is_object());
}
