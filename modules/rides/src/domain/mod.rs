pub mod assignment;
pub mod drivers;
pub mod error;
pub mod geo;
pub mod identity;
pub mod lifecycle;
pub mod repo;
pub mod service;
