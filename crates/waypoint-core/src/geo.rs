//! Spherical distance math for the post-scrape radius filter.
//!
//! Coordinates are lifted onto a sphere of fixed radius as Cartesian vectors;
//! the angle subtended between two vectors times the radius approximates the
//! great-circle distance. Good enough for clipping a search radius, not for
//! surveying.

use crate::types::Coordinates;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Slack allowed beyond the query radius before a place is rejected.
pub const RADIUS_TOLERANCE: f64 = 1.1;

/// A point in 3D Cartesian space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3d {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Project geodetic coordinates onto a sphere of radius `radius`.
    #[must_use]
    pub fn from_geodetic(coords: Coordinates, radius: f64) -> Self {
        let lat = coords.lat.to_radians();
        let lng = coords.lng.to_radians();
        Self {
            x: radius * lat.cos() * lng.cos(),
            y: radius * lat.cos() * lng.sin(),
            z: radius * lat.sin(),
        }
    }

    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Angle between two vectors in radians.
    ///
    /// Returns `None` when either vector is degenerate (zero or non-finite
    /// magnitude), where `acos` would yield NaN.
    #[must_use]
    pub fn angle(&self, other: &Self) -> Option<f64> {
        let denom = self.magnitude() * other.magnitude();
        if denom == 0.0 || !denom.is_finite() {
            return None;
        }
        // rounding can push the cosine just past ±1
        let cos = (self.dot(other) / denom).clamp(-1.0, 1.0);
        let angle = cos.acos();
        angle.is_finite().then_some(angle)
    }
}

/// Approximate great-circle distance in meters, `None` if unknown.
#[must_use]
pub fn great_circle_distance(a: Coordinates, b: Coordinates) -> Option<f64> {
    let va = Vector3d::from_geodetic(a, EARTH_RADIUS_M);
    let vb = Vector3d::from_geodetic(b, EARTH_RADIUS_M);
    va.angle(&vb).map(|angle| angle * EARTH_RADIUS_M)
}

/// Whether a distance lies inside the tolerated radius.
#[must_use]
pub fn within_tolerance(distance_m: f64, radius_m: f64) -> bool {
    distance_m <= radius_m * RADIUS_TOLERANCE
}

/// Whether `point` lies within `radius_m` (plus tolerance) of `center`.
///
/// An unknown distance is rejected.
#[must_use]
pub fn within_radius(center: Coordinates, point: Coordinates, radius_m: f64) -> bool {
    great_circle_distance(center, point).is_some_and(|d| within_tolerance(d, radius_m))
}
