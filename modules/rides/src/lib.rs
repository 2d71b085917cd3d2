//! Ride lifecycle and driver assignment.
//!
//! Other crates should depend on [`contract`] and [`RidesModule`]; the
//! remaining modules are public so integration tests can reach the services
//! and storage directly.

pub mod contract;
pub use contract::{client, error, model};

pub mod config;
pub use config::RidesConfig;

pub mod module;
pub use module::RidesModule;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod gateways;
#[doc(hidden)]
pub mod infra;
