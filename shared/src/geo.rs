use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

use crate::error::{AppError, ErrorKind};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Browser geolocation error codes, plus `0` for a missing capability.
pub const GEOLOCATION_UNSUPPORTED: u16 = 0;
pub const GEOLOCATION_PERMISSION_DENIED: u16 = 1;
pub const GEOLOCATION_POSITION_UNAVAILABLE: u16 = 2;
pub const GEOLOCATION_TIMEOUT: u16 = 3;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("Coordinate value is not finite (NaN or Infinity)")]
    NonFinite,
}

impl From<CoordinateError> for AppError {
    fn from(e: CoordinateError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

/// Raw `{lat, lng}` pair as it crosses the shell boundary. Not validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LatLng", into = "LatLng")]
pub struct ValidatedCoordinate {
    lat: f64,
    lng: f64,
}

impl ValidatedCoordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(CoordinateError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lng(self) -> f64 {
        self.lng
    }

    #[must_use]
    pub fn distance_km(self, other: Self) -> f64 {
        haversine_km(self, other)
    }
}

impl TryFrom<LatLng> for ValidatedCoordinate {
    type Error = CoordinateError;

    fn try_from(value: LatLng) -> Result<Self, Self::Error> {
        Self::new(value.lat, value.lng)
    }
}

impl From<ValidatedCoordinate> for LatLng {
    fn from(coord: ValidatedCoordinate) -> Self {
        Self {
            lat: coord.lat,
            lng: coord.lng,
        }
    }
}

/// Great-circle distance on a 6371 km sphere.
///
/// Evaluated as `2·atan2(√a, √(1−a))` so that identical points yield exactly `0.0`.
#[must_use]
pub fn haversine_km(from: ValidatedCoordinate, to: ValidatedCoordinate) -> f64 {
    let to_rad = PI / 180.0;
    let d_lat = (to.lat - from.lat) * to_rad;
    let d_lng = (to.lng - from.lng) * to_rad;

    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + (from.lat * to_rad).cos()
            * (to.lat * to_rad).cos()
            * (d_lng / 2.0).sin()
            * (d_lng / 2.0).sin();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[must_use]
pub fn format_distance(km: f64) -> String {
    if !km.is_finite() || km < 0.0 {
        return "Unknown".to_string();
    }

    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else if km < 10.0 {
        format!("{km:.1} km")
    } else {
        format!("{km:.0} km")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeolocationError {
    pub code: u16,
    pub message: String,
}

impl GeolocationError {
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            code: GEOLOCATION_UNSUPPORTED,
            message: "Geolocation not supported".to_string(),
        }
    }
}

impl From<&GeolocationError> for AppError {
    fn from(e: &GeolocationError) -> Self {
        let kind = match e.code {
            GEOLOCATION_UNSUPPORTED => ErrorKind::FeatureUnavailable,
            GEOLOCATION_PERMISSION_DENIED => ErrorKind::LocationPermissionDenied,
            _ => ErrorKind::Location,
        };
        AppError::new(kind, e.message.clone()).with_context("geolocation_code", e.code.to_string())
    }
}

/// One-shot reading of the device position, taken once per page load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeolocationSample {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub loaded: bool,
    pub error: Option<GeolocationError>,
}

impl GeolocationSample {
    #[must_use]
    pub fn located(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            loaded: true,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: GeolocationError) -> Self {
        Self {
            lat: None,
            lng: None,
            loaded: true,
            error: Some(error),
        }
    }

    /// The resolved position, if the sample has one and it is a real coordinate.
    #[must_use]
    pub fn coordinate(&self) -> Option<ValidatedCoordinate> {
        if !self.loaded || self.error.is_some() {
            return None;
        }
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => ValidatedCoordinate::new(lat, lng).ok(),
            _ => None,
        }
    }
}
