use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Content type for Problem Details as per RFC 9457.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

const PROBLEM_TYPE_BASE: &str = "https://errors.rideshare.local";

/// RFC 9457 Problem Details, extended with a flat `error` message so that
/// simple clients can read the failure without understanding the envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    title = "Problem",
    description = "RFC 9457 Problem Details with a user-facing `error` message"
)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    /// User-facing message; same text as `detail`.
    pub error: String,
    pub detail: String,
    /// The request path that produced the problem.
    pub instance: String,
    /// Machine-readable error code, e.g. `RIDES_CONFLICT`.
    pub code: String,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        let error: String = detail.into();
        Self {
            type_url: "about:blank".into(),
            title: title.into(),
            status: status.as_u16(),
            detail: error.clone(),
            error,
            instance: String::new(),
            code: String::new(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Axum response wrapper: `status` from the problem, problem+json body.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl From<Problem> for ProblemResponse {
    fn from(p: Problem) -> Self {
        Self(p)
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        (
            status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
            )],
            axum::Json(self.0),
        )
            .into_response()
    }
}

/// One error class a module can emit: fixed status, title and code.
/// Modules declare these as constants and fill in detail and path per call.
#[derive(Debug, Clone, Copy)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    pub code: &'static str,
}

impl ErrDef {
    pub const fn new(status: u16, title: &'static str, code: &'static str) -> Self {
        Self {
            status,
            title,
            code,
        }
    }

    pub fn to_problem(&self, detail: impl Into<String>, instance: &str) -> Problem {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Problem {
            type_url: format!("{PROBLEM_TYPE_BASE}/{}", self.code),
            instance: instance.to_owned(),
            code: self.code.to_owned(),
            ..Problem::new(status, self.title, detail)
        }
    }

    pub fn to_response(&self, detail: impl Into<String>, instance: &str) -> ProblemResponse {
        self.to_problem(detail, instance).into()
    }
}
