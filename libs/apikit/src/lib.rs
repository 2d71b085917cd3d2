//! Shared HTTP plumbing for the rideshare services.
//!
//! - [`problem`]: RFC 9457 Problem Details rendered as `application/problem+json`
//! - [`request_id`]: `x-request-id` generation, propagation and the request trace span

pub mod problem;
pub mod request_id;

pub use problem::{ErrDef, Problem, ProblemResponse, APPLICATION_PROBLEM_JSON};
