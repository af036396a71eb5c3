//! Seismic sources.
//!
//! A [`SourceDefinition`] is the deserialised configuration of one source.
//! Resolving it (with the ground-motion branches chosen for it) produces a
//! [`Source`], which validates its geometry and recurrence models and owns
//! the set of catalog events attributed to it.
//!
//! # Event assignment
//!
//! The event-index set of a source is computed exactly once, after the
//! catalog is generated, and memoised:
//!
//! - zone sources take the events they generated whose epicentre lies
//!   inside the zone polygon;
//! - fault and scenario sources map directly to the events they generated.
//!
//! Computing the assignment a second time is a logic error and fails with
//! [`SourceError::AlreadyAssigned`].

use std::sync::OnceLock;

use quake_types::{BranchSet, EventCatalog, EventId, SourceId, Trace};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::polygon::Polygon;
use crate::recurrence::{GutenbergRichter, RecurrenceSet};

/// A fixed, user-specified rupture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRupture {
    /// Moment magnitude.
    pub magnitude: f64,
    /// Epicentre latitude in degrees.
    pub latitude: f64,
    /// Epicentre longitude in degrees.
    pub longitude: f64,
    /// Centroid depth in kilometres.
    pub depth_km: f64,
    /// Strike azimuth in degrees.
    #[serde(default)]
    pub azimuth_deg: f64,
    /// Dip in degrees.
    #[serde(default = "default_dip_deg")]
    pub dip_deg: f64,
    /// Number of identical copies to place in the catalog.
    #[serde(default = "default_scenario_count")]
    pub count: usize,
}

const fn default_dip_deg() -> f64 {
    90.0
}

const fn default_scenario_count() -> usize {
    1
}

/// Geometry and kind of a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Areal source zone with distributed seismicity.
    Zone {
        /// Zone boundary.
        polygon: Polygon,
        /// Shallowest rupture centroid depth in kilometres.
        #[serde(default)]
        depth_top_km: f64,
        /// Deepest rupture centroid depth in kilometres.
        #[serde(default = "default_depth_bottom_km")]
        depth_bottom_km: f64,
        /// `[min, max]` dip range in degrees; equal bounds fix the dip.
        #[serde(default = "default_dip_range")]
        dip_range_deg: [f64; 2],
        /// `[min, max]` strike range in degrees; equal bounds fix the strike.
        #[serde(default = "default_azimuth_range")]
        azimuth_range_deg: [f64; 2],
    },
    /// Planar fault with a surface trace.
    Fault {
        /// Surface trace of the fault's top edge.
        trace: Trace,
        /// Dip in degrees.
        dip_deg: f64,
        /// Depth of the fault's top edge in kilometres.
        #[serde(default)]
        depth_top_km: f64,
        /// Depth of the fault's bottom edge in kilometres.
        #[serde(default = "default_depth_bottom_km")]
        depth_bottom_km: f64,
    },
    /// A single, fully specified rupture.
    Scenario(ScenarioRupture),
}

const fn default_depth_bottom_km() -> f64 {
    15.0
}

const fn default_dip_range() -> [f64; 2] {
    [90.0, 90.0]
}

const fn default_azimuth_range() -> [f64; 2] {
    [0.0, 360.0]
}

/// Ground-motion branch named in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDefinition {
    /// Registered ground-motion model name.
    pub model: String,
    /// Raw branch weight.
    #[serde(default = "default_branch_weight")]
    pub weight: f64,
}

const fn default_branch_weight() -> f64 {
    1.0
}

/// Deserialised configuration of one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDefinition {
    /// Human-readable source name.
    pub name: String,
    /// Geometry and kind.
    #[serde(flatten)]
    pub kind: SourceKind,
    /// Co-located recurrence models (empty for scenario sources).
    #[serde(default)]
    pub recurrence: Vec<GutenbergRichter>,
    /// Smallest magnitude generated; defaults to the smallest recurrence minimum.
    #[serde(default)]
    pub min_generation_magnitude: Option<f64>,
    /// Number of synthetic events to generate.
    #[serde(default = "default_number_of_events")]
    pub number_of_events: usize,
    /// Ground-motion logic-tree branches for this source.
    pub ground_motion: Vec<BranchDefinition>,
}

const fn default_number_of_events() -> usize {
    1000
}

/// A validated source ready for generation.
#[derive(Debug)]
pub struct Source {
    /// Position in the source list.
    pub id: SourceId,
    /// Human-readable name.
    pub name: String,
    /// Geometry and kind.
    pub kind: SourceKind,
    /// Co-located recurrence models.
    pub recurrence: RecurrenceSet,
    /// Smallest magnitude generated.
    pub min_generation_magnitude: f64,
    /// Number of synthetic events to generate.
    pub number_of_events: usize,
    /// Logic-tree branches for this source.
    pub branches: BranchSet,
    events: OnceLock<Vec<EventId>>,
}

impl Source {
    /// Validate a definition and attach its resolved branches.
    pub fn new(
        id: SourceId,
        definition: &SourceDefinition,
        branches: BranchSet,
    ) -> Result<Self, SourceError> {
        let name = definition.name.clone();
        validate_kind(&name, &definition.kind)?;

        let (recurrence, min_generation_magnitude) = match &definition.kind {
            SourceKind::Scenario(rupture) => (RecurrenceSet::none(), rupture.magnitude),
            SourceKind::Zone { .. } | SourceKind::Fault { .. } => {
                let recurrence = RecurrenceSet::new(&name, definition.recurrence.clone())?;
                let floor = recurrence.min_magnitude().ok_or_else(|| {
                    SourceError::DataUnavailable {
                        what: format!("recurrence model for source `{name}`"),
                    }
                })?;
                let ceiling = recurrence.max_magnitude().unwrap_or(floor);
                let min_gen = definition.min_generation_magnitude.unwrap_or(floor);
                if min_gen >= ceiling {
                    return Err(SourceError::InvalidRecurrence {
                        reason: format!(
                            "source `{name}`: min_generation_magnitude {min_gen} is not below max magnitude {ceiling}"
                        ),
                    });
                }
                (recurrence, min_gen)
            }
        };

        if branches.is_empty() {
            return Err(SourceError::DataUnavailable {
                what: format!("ground-motion branches for source `{name}`"),
            });
        }

        Ok(Self {
            id,
            name,
            kind: definition.kind.clone(),
            recurrence,
            min_generation_magnitude,
            number_of_events: definition.number_of_events,
            branches,
            events: OnceLock::new(),
        })
    }

    /// Whether this is a zone or fault source (as opposed to a scenario).
    pub const fn is_synthetic(&self) -> bool {
        matches!(self.kind, SourceKind::Zone { .. } | SourceKind::Fault { .. })
    }

    /// Compute and memoise the events attributed to this source.
    pub fn assign_events(&self, catalog: &EventCatalog) -> Result<&[EventId], SourceError> {
        if self.events.get().is_some() {
            return Err(SourceError::AlreadyAssigned {
                source_name: self.name.clone(),
            });
        }
        let own = catalog.iter().filter(|e| e.source == self.id);
        let ids: Vec<EventId> = match &self.kind {
            SourceKind::Zone { polygon, .. } => own
                .filter(|e| polygon.contains(&e.centroid))
                .map(|e| e.id)
                .collect(),
            SourceKind::Fault { .. } | SourceKind::Scenario(_) => own.map(|e| e.id).collect(),
        };
        self.events
            .set(ids)
            .map_err(|_ids| SourceError::AlreadyAssigned {
                source_name: self.name.clone(),
            })?;
        self.event_ids()
    }

    /// The memoised event assignment.
    pub fn event_ids(&self) -> Result<&[EventId], SourceError> {
        self.events
            .get()
            .map(Vec::as_slice)
            .ok_or_else(|| SourceError::NotAssigned {
                source_name: self.name.clone(),
            })
    }
}

fn validate_kind(name: &str, kind: &SourceKind) -> Result<(), SourceError> {
    let invalid = |reason: String| SourceError::InvalidGeometry {
        source_name: name.to_owned(),
        reason,
    };
    match kind {
        SourceKind::Zone {
            polygon,
            depth_top_km,
            depth_bottom_km,
            dip_range_deg,
            azimuth_range_deg,
        } => {
            if polygon.is_degenerate() {
                return Err(invalid("zone polygon encloses no area".to_owned()));
            }
            if depth_top_km > depth_bottom_km || *depth_top_km < 0.0 {
                return Err(invalid(format!(
                    "depth range [{depth_top_km}, {depth_bottom_km}] is invalid"
                )));
            }
            check_range(name, "dip", *dip_range_deg, 0.0, 90.0)?;
            if dip_range_deg[0] <= 0.0 {
                return Err(invalid("dip must be positive".to_owned()));
            }
            check_range(name, "azimuth", *azimuth_range_deg, 0.0, 360.0)?;
        }
        SourceKind::Fault {
            trace,
            dip_deg,
            depth_top_km,
            depth_bottom_km,
        } => {
            if trace.start.distance_km(&trace.end) <= f64::EPSILON {
                return Err(invalid("fault trace has zero length".to_owned()));
            }
            if *dip_deg <= 0.0 || *dip_deg > 90.0 {
                return Err(invalid(format!("dip {dip_deg} outside (0, 90]")));
            }
            if depth_top_km >= depth_bottom_km || *depth_top_km < 0.0 {
                return Err(invalid(format!(
                    "depth range [{depth_top_km}, {depth_bottom_km}] is invalid"
                )));
            }
        }
        SourceKind::Scenario(rupture) => {
            if !rupture.magnitude.is_finite() {
                return Err(invalid("scenario magnitude must be finite".to_owned()));
            }
            if rupture.count == 0 {
                return Err(invalid("scenario count must be at least 1".to_owned()));
            }
            if rupture.dip_deg <= 0.0 || rupture.dip_deg > 90.0 {
                return Err(invalid(format!("dip {} outside (0, 90]", rupture.dip_deg)));
            }
        }
    }
    Ok(())
}

fn check_range(
    name: &str,
    label: &str,
    range: [f64; 2],
    lower: f64,
    upper: f64,
) -> Result<(), SourceError> {
    let [lo, hi] = range;
    if lo > hi || lo < lower || hi > upper {
        return Err(SourceError::InvalidGeometry {
            source_name: name.to_owned(),
            reason: format!("{label} range [{lo}, {hi}] outside [{lower}, {upper}]"),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quake_types::{Event, GeoPoint, ModelId, RuptureGeometry};

    use super::*;

    fn zone_definition() -> SourceDefinition {
        let yaml = r"
name: capital
kind: zone
polygon:
  - { latitude: -36.0, longitude: 148.0 }
  - { latitude: -36.0, longitude: 150.0 }
  - { latitude: -34.0, longitude: 150.0 }
  - { latitude: -34.0, longitude: 148.0 }
depth_top_km: 2.0
depth_bottom_km: 12.0
dip_range_deg: [35.0, 60.0]
recurrence:
  - { min_magnitude: 4.5, max_magnitude: 7.0, a_min: 0.2, b_value: 1.0 }
number_of_events: 50
ground_motion:
  - { model: toro97, weight: 1.0 }
";
        serde_yml::from_str(yaml).unwrap()
    }

    fn event_at(source: usize, lat: f64, lon: f64) -> Event {
        let centroid = GeoPoint::new(lat, lon);
        Event {
            id: EventId::new(0),
            source: SourceId::new(source),
            recurrence_index: 0,
            magnitude: 5.0,
            centroid,
            depth_km: 5.0,
            rupture: RuptureGeometry {
                length_km: 1.0,
                width_km: 1.0,
                dip_deg: 90.0,
                azimuth_deg: 0.0,
            },
            trace: Trace {
                start: centroid,
                end: centroid,
            },
        }
    }

    #[test]
    fn zone_definition_parses() {
        let def = zone_definition();
        assert_eq!(def.name, "capital");
        assert!(matches!(def.kind, SourceKind::Zone { .. }));
        assert_eq!(def.recurrence.len(), 1);
    }

    #[test]
    fn definition_survives_a_json_round_trip() {
        let def = zone_definition();
        let json = serde_json::to_string(&def).unwrap();
        assert!(json.contains("\"kind\":\"zone\""));
        let parsed: SourceDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, def);
    }

    #[test]
    fn min_generation_magnitude_defaults_to_recurrence_minimum() {
        let source = Source::new(
            SourceId::new(0),
            &zone_definition(),
            BranchSet::single(ModelId::new(0)),
        )
        .unwrap();
        assert!((source.min_generation_magnitude - 4.5).abs() < f64::EPSILON);
        assert!(source.is_synthetic());
    }

    #[test]
    fn zone_assignment_uses_containment_and_is_memoised() {
        let source = Source::new(
            SourceId::new(0),
            &zone_definition(),
            BranchSet::single(ModelId::new(0)),
        )
        .unwrap();
        let catalog = EventCatalog::new(vec![
            event_at(0, -35.0, 149.0),
            event_at(1, -35.0, 149.0),
            event_at(0, -30.0, 149.0),
            event_at(0, -34.5, 148.5),
        ]);
        assert!(matches!(
            source.event_ids(),
            Err(SourceError::NotAssigned { .. })
        ));
        let ids = source.assign_events(&catalog).unwrap().to_vec();
        assert_eq!(ids, vec![EventId::new(0), EventId::new(3)]);
        assert!(matches!(
            source.assign_events(&catalog),
            Err(SourceError::AlreadyAssigned { .. })
        ));
    }

    #[test]
    fn degenerate_zone_is_rejected() {
        let mut def = zone_definition();
        if let SourceKind::Zone { polygon, .. } = &mut def.kind {
            *polygon = Polygon::new(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)]);
        }
        let result = Source::new(SourceId::new(0), &def, BranchSet::single(ModelId::new(0)));
        assert!(matches!(result, Err(SourceError::InvalidGeometry { .. })));
    }

    #[test]
    fn missing_recurrence_is_unavailable_data() {
        let mut def = zone_definition();
        def.recurrence.clear();
        let result = Source::new(SourceId::new(0), &def, BranchSet::single(ModelId::new(0)));
        assert!(matches!(
            result,
            Err(SourceError::Weights { .. } | SourceError::DataUnavailable { .. })
        ));
    }
}
