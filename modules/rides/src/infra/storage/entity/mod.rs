//! SeaORM entities. Enumerations are stored as their string form and
//! locations as WKT `POINT(lng lat)` text.

pub mod driver;
pub mod profile;
pub mod ride;
