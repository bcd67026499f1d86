//! Geographic coordinate primitives.
//!
//! Provides the basic lat/lng point type, bounding-box sampling for random
//! route endpoints, and the degree/kilometre conversions used when
//! synthesizing fallback paths.
//!
//! # Conventions
//!
//! - Latitude in degrees, positive north, valid range -90..=90
//! - Longitude in degrees, positive east, valid range -180..=180
//! - Distances in kilometres; one degree of latitude is ~111.32 km,
//!   longitude degrees shrink by `cos(latitude)`

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kilometres per degree of latitude (also per degree of longitude at the
/// equator).
pub const KM_PER_DEGREE: f64 = 111.32;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LNG: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LNG: f64 = 180.0;

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check whether the point lies within the valid geographic range.
    pub fn is_valid(&self) -> bool {
        (MIN_LAT..=MAX_LAT).contains(&self.lat) && (MIN_LNG..=MAX_LNG).contains(&self.lng)
    }

    /// Offset this point by a heading (radians, 0 = east, counter-clockwise)
    /// and a distance expressed in degrees of latitude.
    ///
    /// The longitude component is stretched by `1 / cos(lat)` so the step
    /// covers roughly the same ground distance east-west as north-south.
    pub fn offset(&self, heading_rad: f64, distance_deg: f64) -> Self {
        let lat = self.lat + heading_rad.sin() * distance_deg;
        let lng = self.lng + heading_rad.cos() * (distance_deg / self.lat.to_radians().cos());
        Self { lat, lng }
    }

    /// Great-circle-free flat distance to another point, in degrees.
    ///
    /// Good enough for the short hops this crate deals in; never used for
    /// navigation.
    pub fn distance_deg(&self, other: &Self) -> f64 {
        let dlat = other.lat - self.lat;
        let dlng = other.lng - self.lng;
        (dlat * dlat + dlng * dlng).sqrt()
    }
}

/// An axis-aligned geographic bounding box.
///
/// Used to confine random route endpoint sampling to the simulated
/// metropolitan area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge in degrees.
    pub min_lat: f64,
    /// Western edge in degrees.
    pub min_lng: f64,
    /// Northern edge in degrees.
    pub max_lat: f64,
    /// Eastern edge in degrees.
    pub max_lng: f64,
}

impl BoundingBox {
    /// Create a bounding box from its southwest and northeast corners.
    pub fn new(min_lat: f64, min_lng: f64, max_lat: f64, max_lng: f64) -> Self {
        Self {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        }
    }

    /// Check that the box is well-formed and within geographic range.
    pub fn is_valid(&self) -> bool {
        self.min_lat < self.max_lat
            && self.min_lng < self.max_lng
            && GeoPoint::new(self.min_lat, self.min_lng).is_valid()
            && GeoPoint::new(self.max_lat, self.max_lng).is_valid()
    }

    /// Check whether a point lies within the box (edges inclusive).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }

    /// Sample a uniformly random point inside the box.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> GeoPoint {
        GeoPoint {
            lat: rng.random_range(self.min_lat..self.max_lat),
            lng: rng.random_range(self.min_lng..self.max_lng),
        }
    }
}
