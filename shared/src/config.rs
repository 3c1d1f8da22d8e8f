use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capabilities::{ApiBaseUrl, UrlError};
use crate::error::{AppError, ErrorKind};
use crate::geo::LatLng;
use crate::proximity::DEFAULT_RADIUS_KM;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_MAP_ZOOM: f64 = 13.0;
pub const MIN_MAP_ZOOM: f64 = 1.0;
pub const MAX_MAP_ZOOM: f64 = 19.0;
pub const MAX_RADIUS_KM: f64 = 20_000.0;

/// Where the map opens before the user location is known.
pub const DEFAULT_MAP_CENTER: LatLng = LatLng {
    lat: 27.642_561_080_058_26,
    lng: 85.325_553_985_988_79,
};

/// Whether adding a camp needs a signed-in user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampWritePolicy {
    /// Refuse locally without a session; always send the bearer token.
    #[default]
    RequireBearer,
    /// Send the token when there is one, otherwise send the request anyway.
    Optional,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error("nearby radius must be between 0 and 20000 km, got {0}")]
    Radius(f64),
    #[error("map zoom must be between 1 and 19, got {0}")]
    Zoom(f64),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

/// Settings the shell provides at startup. Missing fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigInput {
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default)]
    pub nearby_radius_km: Option<f64>,
    #[serde(default)]
    pub map_zoom: Option<f64>,
    #[serde(default)]
    pub camp_write_policy: Option<CampWritePolicy>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_base_url: ApiBaseUrl,
    pub nearby_radius_km: f64,
    pub map_zoom: f64,
    pub camp_write_policy: CampWritePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: ApiBaseUrl::default(),
            nearby_radius_km: DEFAULT_RADIUS_KM,
            map_zoom: DEFAULT_MAP_ZOOM,
            camp_write_policy: CampWritePolicy::default(),
        }
    }
}

impl AppConfig {
    /// Applies `input` on top of `self`. Nothing changes when any field is invalid.
    pub fn merged(&self, input: ConfigInput) -> Result<Self, ConfigError> {
        let api_base_url = match input.api_base_url {
            Some(raw) => ApiBaseUrl::new(raw)?,
            None => self.api_base_url.clone(),
        };

        let nearby_radius_km = input.nearby_radius_km.unwrap_or(self.nearby_radius_km);
        if !(0.0..=MAX_RADIUS_KM).contains(&nearby_radius_km) {
            return Err(ConfigError::Radius(nearby_radius_km));
        }

        let map_zoom = input.map_zoom.unwrap_or(self.map_zoom);
        if !(MIN_MAP_ZOOM..=MAX_MAP_ZOOM).contains(&map_zoom) {
            return Err(ConfigError::Zoom(map_zoom));
        }

        Ok(Self {
            api_base_url,
            nearby_radius_km,
            map_zoom,
            camp_write_policy: input.camp_write_policy.unwrap_or(self.camp_write_policy),
        })
    }
}
