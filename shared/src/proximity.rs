//! Proximity filter: which camps lie within a radius of the user.
//!
//! Pure functions over the camp list. The user location and every camp
//! position are validated first; anything invalid is left out instead of
//! producing an error, and input order is preserved.

use crate::camp::Camp;
use crate::geo::{haversine_km, LatLng, ValidatedCoordinate};

pub const DEFAULT_RADIUS_KM: f64 = 100.0;

/// A camp kept by the filter together with its distance to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyCamp<'a> {
    pub camp: &'a Camp,
    pub distance_km: f64,
}

/// Camps whose great-circle distance to `user` is at most `radius_km`, in input order.
///
/// Returns an empty list when the user location is not a valid coordinate or
/// the radius is negative or not finite.
#[must_use]
pub fn nearby_camps<'a>(user: LatLng, camps: &'a [Camp], radius_km: f64) -> Vec<&'a Camp> {
    nearby_with_distance(user, camps, radius_km)
        .into_iter()
        .map(|n| n.camp)
        .collect()
}

#[must_use]
pub fn nearby_with_distance<'a>(
    user: LatLng,
    camps: &'a [Camp],
    radius_km: f64,
) -> Vec<NearbyCamp<'a>> {
    let Ok(origin) = ValidatedCoordinate::try_from(user) else {
        return Vec::new();
    };
    if !radius_km.is_finite() || radius_km < 0.0 {
        return Vec::new();
    }

    camps
        .iter()
        .filter_map(|camp| {
            let distance_km = haversine_km(origin, camp.coordinate()?);
            (distance_km <= radius_km).then_some(NearbyCamp { camp, distance_km })
        })
        .collect()
}
