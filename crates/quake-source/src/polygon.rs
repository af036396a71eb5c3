//! Zone polygons.
//!
//! Containment uses ray casting in longitude/latitude space, which is exact
//! for polygons that do not straddle the antimeridian or a pole.

use quake_types::GeoPoint;
use serde::{Deserialize, Serialize};

/// A closed polygon given by its vertices (the closing edge is implicit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    vertices: Vec<GeoPoint>,
}

/// Axis-aligned bounds in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Southern edge.
    pub min_latitude: f64,
    /// Northern edge.
    pub max_latitude: f64,
    /// Western edge.
    pub min_longitude: f64,
    /// Eastern edge.
    pub max_longitude: f64,
}

impl Polygon {
    /// Create a polygon from its vertices.
    pub const fn new(vertices: Vec<GeoPoint>) -> Self {
        Self { vertices }
    }

    /// The vertices.
    pub fn vertices(&self) -> &[GeoPoint] {
        &self.vertices
    }

    /// Whether the polygon can enclose any area.
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3 || self.signed_area().abs() <= f64::EPSILON
    }

    /// Shoelace area in square degrees (sign gives orientation).
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                a.longitude * b.latitude - b.longitude * a.latitude
            })
            .sum();
        twice / 2.0
    }

    /// Bounding box of the vertices.
    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.vertices.first()?;
        let mut bounds = Bounds {
            min_latitude: first.latitude,
            max_latitude: first.latitude,
            min_longitude: first.longitude,
            max_longitude: first.longitude,
        };
        for v in &self.vertices {
            bounds.min_latitude = bounds.min_latitude.min(v.latitude);
            bounds.max_latitude = bounds.max_latitude.max(v.latitude);
            bounds.min_longitude = bounds.min_longitude.min(v.longitude);
            bounds.max_longitude = bounds.max_longitude.max(v.longitude);
        }
        Some(bounds)
    }

    /// Whether `point` lies inside the polygon.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let (x, y) = (point.longitude, point.latitude);
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = (self.vertices[i].longitude, self.vertices[i].latitude);
            let (xj, yj) = (self.vertices[j].longitude, self.vertices[j].latitude);
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(vec![
            GeoPoint::new(-36.0, 148.0),
            GeoPoint::new(-36.0, 150.0),
            GeoPoint::new(-34.0, 150.0),
            GeoPoint::new(-34.0, 148.0),
        ])
    }

    #[test]
    fn contains_interior_point() {
        assert!(square().contains(&GeoPoint::new(-35.0, 149.0)));
    }

    #[test]
    fn excludes_exterior_point() {
        assert!(!square().contains(&GeoPoint::new(-33.0, 149.0)));
        assert!(!square().contains(&GeoPoint::new(-35.0, 151.0)));
    }

    #[test]
    fn bounds_cover_vertices() {
        let b = square().bounds();
        assert_eq!(
            b,
            Some(Bounds {
                min_latitude: -36.0,
                max_latitude: -34.0,
                min_longitude: 148.0,
                max_longitude: 150.0,
            })
        );
    }

    #[test]
    fn collinear_polygon_is_degenerate() {
        let line = Polygon::new(vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(2.0, 2.0),
        ]);
        assert!(line.is_degenerate());
        assert!(!square().is_degenerate());
    }
}
