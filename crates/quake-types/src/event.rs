//! Rupture events and the event catalog.
//!
//! An [`Event`] is one rupture. Events are created once by the generator at
//! run start and are read-only afterwards; the [`EventCatalog`] only hands
//! out shared references.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::ids::{EventId, SourceId};

/// Rectangular rupture geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuptureGeometry {
    /// Along-strike length in kilometres.
    pub length_km: f64,
    /// Down-dip width in kilometres.
    pub width_km: f64,
    /// Dip angle in degrees from horizontal, `(0, 90]`.
    pub dip_deg: f64,
    /// Strike azimuth in degrees clockwise from north.
    pub azimuth_deg: f64,
}

impl RuptureGeometry {
    /// Horizontal extent of the rupture perpendicular to strike, in kilometres.
    pub fn surface_width_km(&self) -> f64 {
        self.width_km * self.dip_deg.to_radians().cos()
    }

    /// Vertical extent of the rupture, in kilometres.
    pub fn vertical_extent_km(&self) -> f64 {
        self.width_km * self.dip_deg.to_radians().sin()
    }
}

/// Surface trace of the top edge of a rupture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Start of the trace.
    pub start: GeoPoint,
    /// End of the trace.
    pub end: GeoPoint,
}

/// A single rupture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Position in the catalog.
    pub id: EventId,
    /// The source that generated this event.
    pub source: SourceId,
    /// Index of the source's recurrence model this event was drawn from.
    pub recurrence_index: usize,
    /// Moment magnitude.
    pub magnitude: f64,
    /// Surface projection of the rupture centroid.
    pub centroid: GeoPoint,
    /// Depth of the rupture centroid in kilometres.
    pub depth_km: f64,
    /// Rupture rectangle.
    pub rupture: RuptureGeometry,
    /// Surface projection of the rupture's top edge.
    pub trace: Trace,
}

impl Event {
    /// Depth of the top edge of the rupture, never above the surface.
    pub fn depth_to_top_km(&self) -> f64 {
        (self.depth_km - self.rupture.vertical_extent_km() / 2.0).max(0.0)
    }
}

/// The immutable, ordered set of events for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCatalog {
    events: Vec<Event>,
}

impl EventCatalog {
    /// Build a catalog, renumbering event ids to match catalog order.
    pub fn new(mut events: Vec<Event>) -> Self {
        for (index, event) in events.iter_mut().enumerate() {
            event.id = EventId::new(index);
        }
        Self { events }
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Look up an event.
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(id.index())
    }

    /// All events in catalog order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Iterate events in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    /// Per-event magnitudes in catalog order.
    pub fn magnitudes(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.magnitude).collect()
    }

    /// Per-event source ids in catalog order.
    pub fn sources(&self) -> Vec<crate::ids::SourceId> {
        self.events.iter().map(|e| e.source).collect()
    }
}

impl<'a> IntoIterator for &'a EventCatalog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
