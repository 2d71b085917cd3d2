use std::sync::Arc;

use apikit::ProblemResponse;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::api::rest::error::{map_domain_error, INTERNAL, UNAUTHENTICATED};
use crate::contract::model::SecurityContext;
use crate::domain::error::DomainError;
use crate::domain::identity::IdentityService;

/// Header carrying the caller id, set by the trusted authentication proxy.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the resolved caller. Rejects with 401 when the header is
/// missing, malformed or names no known profile, and with 403 for suspended
/// or banned accounts.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub SecurityContext);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_owned();

        let identity = parts
            .extensions
            .get::<Arc<IdentityService>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("identity service is not installed on the router");
                INTERNAL.to_response("Something went wrong, please try again", &instance)
            })?;

        let caller_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| UNAUTHENTICATED.to_response("Unauthorized", &instance))?;

        match identity.resolve(caller_id).await {
            Ok(ctx) => {
                tracing::Span::current().record("caller_id", tracing::field::display(caller_id));
                Ok(Caller(ctx))
            }
            Err(DomainError::ProfileNotFound { .. }) => {
                Err(UNAUTHENTICATED.to_response("Unauthorized", &instance))
            }
            Err(e) => Err(map_domain_error(&e, &instance)),
        }
    }
}
