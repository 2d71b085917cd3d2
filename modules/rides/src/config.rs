use serde::{Deserialize, Serialize};

use crate::domain::service::ServiceConfig;

/// Configuration for the rides module (`modules.rides` in the app config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RidesConfig {
    #[serde(default = "default_search_radius_km")]
    pub default_search_radius_km: f64,
    #[serde(default = "default_max_search_radius_km")]
    pub max_search_radius_km: f64,
    #[serde(default = "default_average_speed_kmh")]
    pub average_speed_kmh: f64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    #[serde(default = "default_max_note_length")]
    pub max_note_length: usize,
    /// How long a ride may sit in `requested` before admins can expire it.
    #[serde(default = "default_request_ttl_secs")]
    pub request_ttl_secs: u64,
}

impl Default for RidesConfig {
    fn default() -> Self {
        Self {
            default_search_radius_km: default_search_radius_km(),
            max_search_radius_km: default_max_search_radius_km(),
            average_speed_kmh: default_average_speed_kmh(),
            max_candidates: default_max_candidates(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_note_length: default_max_note_length(),
            request_ttl_secs: default_request_ttl_secs(),
        }
    }
}

impl RidesConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.default_search_radius_km > 0.0
                && self.default_search_radius_km <= self.max_search_radius_km,
            "default_search_radius_km must be in (0, max_search_radius_km]"
        );
        anyhow::ensure!(self.average_speed_kmh > 0.0, "average_speed_kmh must be positive");
        anyhow::ensure!(self.max_candidates > 0, "max_candidates must be positive");
        anyhow::ensure!(
            self.default_page_size > 0 && self.default_page_size <= self.max_page_size,
            "default_page_size must be in (0, max_page_size]"
        );
        Ok(())
    }
}

impl From<RidesConfig> for ServiceConfig {
    fn from(c: RidesConfig) -> Self {
        ServiceConfig {
            default_search_radius_km: c.default_search_radius_km,
            max_search_radius_km: c.max_search_radius_km,
            average_speed_kmh: c.average_speed_kmh,
            max_candidates: c.max_candidates,
            default_page_size: c.default_page_size,
            max_page_size: c.max_page_size,
            max_note_length: c.max_note_length,
            request_ttl_secs: c.request_ttl_secs,
        }
    }
}

fn default_search_radius_km() -> f64 {
    10.0
}

fn default_max_search_radius_km() -> f64 {
    50.0
}

fn default_average_speed_kmh() -> f64 {
    30.0
}

fn default_max_candidates() -> usize {
    10
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}

fn default_max_note_length() -> usize {
    500
}

fn default_request_ttl_secs() -> u64 {
    900
}
