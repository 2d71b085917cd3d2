pub mod client;
pub mod error;
pub mod model;

pub use error::RidesError;
pub use model::*;
