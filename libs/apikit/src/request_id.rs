use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::Router;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn header() -> HeaderName {
    HeaderName::from_static(REQUEST_ID_HEADER)
}

/// Generates a nanoid for requests that arrive without an id.
#[derive(Clone, Default)]
pub struct NanoRequestId;

impl MakeRequestId for NanoRequestId {
    fn make_request_id<B>(&mut self, _req: &Request<B>) -> Option<RequestId> {
        let id = nanoid::nanoid!();
        Some(RequestId::new(id.parse().ok()?))
    }
}

fn request_span(req: &Request<Body>) -> tracing::Span {
    let rid = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("n/a");
    // `caller_id` is filled in once the caller extractor resolves the identity.
    tracing::info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = %rid,
        caller_id = Empty,
    )
}

#[allow(clippy::type_complexity)]
fn trace_layer(
) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, fn(&Request<Body>) -> tracing::Span> {
    TraceLayer::new_for_http().make_span_with(request_span as fn(&Request<Body>) -> tracing::Span)
}

/// Wrap a router so every request carries an `x-request-id` (generated when
/// absent), runs inside an `http_request` span, and echoes the id back.
pub fn with_request_tracing(router: Router) -> Router {
    // Outermost layer is applied last: the id is set before the span opens.
    router
        .layer(PropagateRequestIdLayer::new(header()))
        .layer(trace_layer())
        .layer(SetRequestIdLayer::new(header(), NanoRequestId))
}
