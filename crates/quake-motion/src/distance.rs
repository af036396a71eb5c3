//! Site-to-rupture distance metrics.
//!
//! The Joyner-Boore and rupture distances treat the rupture as a rectangle
//! whose top edge is the event trace, dipping to the right of strike. Both
//! are computed in a local tangent plane anchored at the trace start, which
//! is accurate for site-to-rupture distances of a few hundred kilometres.

use ndarray::Array2;
use quake_types::{Event, EventCatalog, GeoPoint, Site};
use serde::{Deserialize, Serialize};

/// Which distance a ground-motion model is regressed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Great-circle distance to the epicentre.
    #[default]
    Epicentral,
    /// Straight-line distance to the hypocentre.
    Hypocentral,
    /// Distance to the surface projection of the rupture.
    JoynerBoore,
    /// Distance to the nearest edge of the rupture plane.
    Rupture,
}

impl DistanceMetric {
    /// Distance in kilometres from `site` to `event`.
    pub fn distance_km(self, site: &GeoPoint, event: &Event) -> f64 {
        match self {
            Self::Epicentral => site.distance_km(&event.centroid),
            Self::Hypocentral => site.distance_km(&event.centroid).hypot(event.depth_km),
            Self::JoynerBoore => joyner_boore(site, event).0,
            Self::Rupture => {
                let (rjb, beyond_bottom) = joyner_boore(site, event);
                let top = event.depth_to_top_km();
                let z = if beyond_bottom {
                    top + event.rupture.vertical_extent_km()
                } else {
                    top
                };
                rjb.hypot(z)
            }
        }
    }

    /// `[site, event]` distance matrix.
    pub fn matrix(self, sites: &[Site], catalog: &EventCatalog) -> Array2<f64> {
        let events = catalog.events();
        Array2::from_shape_fn((sites.len(), events.len()), |(i, e)| {
            self.distance_km(&sites[i].location, &events[e])
        })
    }
}

/// Joyner-Boore distance, plus whether the site lies past the down-dip edge.
fn joyner_boore(site: &GeoPoint, event: &Event) -> (f64, bool) {
    let (east, north) = event.trace.start.local_xy(site);
    let strike = event.rupture.azimuth_deg.to_radians();
    let along = east * strike.sin() + north * strike.cos();
    let across = east * strike.cos() - north * strike.sin();

    let length = event.rupture.length_km;
    let surface_width = event.rupture.surface_width_km();

    let dx = (-along).max(along - length).max(0.0);
    let dy = (-across).max(across - surface_width).max(0.0);
    (dx.hypot(dy), across > surface_width)
}
