//! Geodesy on a spherical Earth.
//!
//! Distances between sites and ruptures are computed great-circle for
//! epicentral distance, and on a local tangent plane for rupture-geometry
//! distances where the extent of a rupture (tens of kilometres) makes the
//! flat-Earth error negligible.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the Earth's surface in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees, positive north.
    pub latitude: f64,
    /// Longitude in decimal degrees, positive east.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude in degrees.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle (haversine) distance to `other` in kilometres.
    pub fn distance_km(&self, other: &Self) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let d_phi = phi2 - phi1;
        let d_lambda = (other.longitude - self.longitude).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// Initial bearing from `self` to `other`, degrees clockwise from north in `[0, 360)`.
    pub fn bearing_deg(&self, other: &Self) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let d_lambda = (other.longitude - self.longitude).to_radians();

        let y = d_lambda.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
        y.atan2(x).to_degrees().rem_euclid(360.0)
    }

    /// The point reached by travelling `distance_km` along `azimuth_deg`.
    pub fn offset(&self, azimuth_deg: f64, distance_km: f64) -> Self {
        let delta = distance_km / EARTH_RADIUS_KM;
        let theta = azimuth_deg.to_radians();
        let phi1 = self.latitude.to_radians();
        let lambda1 = self.longitude.to_radians();

        let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

        Self {
            latitude: phi2.to_degrees(),
            longitude: lambda2.to_degrees(),
        }
    }

    /// Project `other` onto the tangent plane at `self`.
    ///
    /// Returns `(east_km, north_km)` using an equirectangular projection
    /// centred on the mean latitude of the two points.
    pub fn local_xy(&self, other: &Self) -> (f64, f64) {
        let mean_lat = ((self.latitude + other.latitude) / 2.0).to_radians();
        let km_per_deg = EARTH_RADIUS_KM.to_radians();
        let east = (other.longitude - self.longitude) * km_per_deg * mean_lat.cos();
        let north = (other.latitude - self.latitude) * km_per_deg;
        (east, north)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        assert!((a.distance_km(&b) - 111.19).abs() < 0.01);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let a = GeoPoint::new(-35.3, 149.1);
        assert!(a.distance_km(&a).abs() < 1e-12);
    }

    #[test]
    fn offset_then_measure_round_trips() {
        let origin = GeoPoint::new(-33.0, 151.0);
        let dest = origin.offset(45.0, 50.0);
        assert!((origin.distance_km(&dest) - 50.0).abs() < 1e-6);
        assert!((origin.bearing_deg(&dest) - 45.0).abs() < 1e-6);
    }

    #[test]
    fn local_xy_matches_haversine_for_short_distances() {
        let origin = GeoPoint::new(-33.0, 151.0);
        let dest = origin.offset(120.0, 20.0);
        let (x, y) = origin.local_xy(&dest);
        assert!(((x * x + y * y).sqrt() - 20.0).abs() < 0.05);
        assert!(x > 0.0);
        assert!(y < 0.0);
    }
}
