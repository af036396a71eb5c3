//! Event catalog generation.
//!
//! [`EventGenerator`] builds the immutable [`EventCatalog`] from validated
//! [`Source`]s:
//!
//! - **Scenario mode** places the configured ruptures of every scenario
//!   source (each repeated `count` times).
//! - **Synthetic mode** samples `number_of_events` ruptures per zone or fault
//!   source, split among its recurrence models by weight. Magnitudes are
//!   drawn either uniformly over `[min_generation_magnitude, mmax]` (the
//!   activity array then carries the Gutenberg-Richter shape) or by
//!   inverse-CDF sampling of the recurrence law.
//!
//! Generation never yields an implicit empty catalog: a mode with no usable
//! sources fails with [`SourceError::DataUnavailable`]. Once the catalog is
//! built, every participating source's event assignment is computed.

use quake_types::{Event, EventCatalog, EventId, GeoPoint, RuptureGeometry, Trace};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::SourceError;
use crate::recurrence::GutenbergRichter;
use crate::scaling::{ScalingConfig, rupture_dimensions};
use crate::source::{ScenarioRupture, Source, SourceKind};

/// Maximum bounding-box draws per zone epicentre before giving up.
const MAX_REJECTION_DRAWS: usize = 10_000;

/// Which kind of catalog to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Fixed, user-specified ruptures.
    Scenario,
    /// Sampled ruptures from zone and fault sources.
    Synthetic,
}

/// How synthetic magnitudes are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeSampling {
    /// Uniform over the generation range; the recurrence shape lives in the activity.
    #[default]
    Uniform,
    /// Inverse-CDF draws from the recurrence law.
    Recurrence,
}

/// Builds event catalogs from sources.
#[derive(Debug, Clone, Default)]
pub struct EventGenerator {
    scaling: ScalingConfig,
    sampling: MagnitudeSampling,
}

impl EventGenerator {
    /// Create a generator.
    pub const fn new(scaling: ScalingConfig, sampling: MagnitudeSampling) -> Self {
        Self { scaling, sampling }
    }

    /// The magnitude sampling policy.
    pub const fn sampling(&self) -> MagnitudeSampling {
        self.sampling
    }

    /// Generate the catalog and assign events to their sources.
    ///
    /// Sources that do not take part in `mode` are left unassigned.
    pub fn generate(
        &self,
        mode: GenerationMode,
        sources: &[Source],
        rng: &mut impl Rng,
    ) -> Result<EventCatalog, SourceError> {
        let participating: Vec<&Source> = sources
            .iter()
            .filter(|s| match mode {
                GenerationMode::Scenario => !s.is_synthetic(),
                GenerationMode::Synthetic => s.is_synthetic(),
            })
            .collect();

        if participating.is_empty() {
            let what = match mode {
                GenerationMode::Scenario => "scenario rupture definition",
                GenerationMode::Synthetic => "zone or fault source data",
            };
            return Err(SourceError::DataUnavailable {
                what: what.to_owned(),
            });
        }

        let mut events = Vec::new();
        for source in &participating {
            let before = events.len();
            match &source.kind {
                SourceKind::Scenario(rupture) => {
                    events.extend(self.scenario_events(source, rupture));
                }
                SourceKind::Zone { .. } | SourceKind::Fault { .. } => {
                    self.synthetic_events(source, rng, &mut events)?;
                }
            }
            debug!(
                source = %source.name,
                events = events.len() - before,
                "Source events generated"
            );
        }

        let catalog = EventCatalog::new(events);
        for source in &participating {
            source.assign_events(&catalog)?;
        }

        info!(
            mode = ?mode,
            sources = participating.len(),
            events = catalog.len(),
            "Event catalog generated"
        );
        Ok(catalog)
    }

    fn scenario_events(&self, source: &Source, rupture: &ScenarioRupture) -> Vec<Event> {
        let (length_km, width_km) = rupture_dimensions(
            rupture.magnitude,
            rupture.dip_deg,
            self.scaling.seismogenic_thickness_km,
            None,
        );
        let geometry = RuptureGeometry {
            length_km,
            width_km,
            dip_deg: rupture.dip_deg,
            azimuth_deg: rupture.azimuth_deg,
        };
        let centroid = GeoPoint::new(rupture.latitude, rupture.longitude);
        let event = Event {
            id: EventId::new(0),
            source: source.id,
            recurrence_index: 0,
            magnitude: rupture.magnitude,
            centroid,
            depth_km: rupture.depth_km,
            rupture: geometry,
            trace: trace_from_centroid(centroid, &geometry),
        };
        vec![event; rupture.count]
    }

    fn synthetic_events(
        &self,
        source: &Source,
        rng: &mut impl Rng,
        out: &mut Vec<Event>,
    ) -> Result<(), SourceError> {
        let counts = source.recurrence.split_counts(source.number_of_events);
        for (k, (model, &count)) in source.recurrence.models().iter().zip(&counts).enumerate() {
            for _ in 0..count {
                let magnitude = self.sample_magnitude(model, source.min_generation_magnitude, rng);
                let event = match &source.kind {
                    SourceKind::Zone {
                        polygon,
                        depth_top_km,
                        depth_bottom_km,
                        dip_range_deg,
                        azimuth_range_deg,
                    } => {
                        let centroid = sample_in_polygon(source, polygon, rng)?;
                        let depth_km = uniform(*depth_top_km, *depth_bottom_km, rng);
                        let dip_deg = uniform(dip_range_deg[0], dip_range_deg[1], rng);
                        let azimuth_deg =
                            uniform(azimuth_range_deg[0], azimuth_range_deg[1], rng) % 360.0;
                        let (length_km, width_km) = rupture_dimensions(
                            magnitude,
                            dip_deg,
                            self.layer_thickness(*depth_top_km, *depth_bottom_km),
                            None,
                        );
                        let rupture = RuptureGeometry {
                            length_km,
                            width_km,
                            dip_deg,
                            azimuth_deg,
                        };
                        Event {
                            id: EventId::new(0),
                            source: source.id,
                            recurrence_index: k,
                            magnitude,
                            centroid,
                            depth_km,
                            rupture,
                            trace: trace_from_centroid(centroid, &rupture),
                        }
                    }
                    SourceKind::Fault {
                        trace,
                        dip_deg,
                        depth_top_km,
                        depth_bottom_km,
                    } => self.fault_event(
                        source,
                        k,
                        magnitude,
                        trace,
                        *dip_deg,
                        (*depth_top_km, *depth_bottom_km),
                        rng,
                    ),
                    SourceKind::Scenario(_) => continue,
                };
                out.push(event);
            }
        }
        Ok(())
    }

    fn fault_event(
        &self,
        source: &Source,
        recurrence_index: usize,
        magnitude: f64,
        trace: &Trace,
        dip_deg: f64,
        (depth_top_km, depth_bottom_km): (f64, f64),
        rng: &mut impl Rng,
    ) -> Event {
        let trace_length = trace.start.distance_km(&trace.end);
        let azimuth_deg = trace.start.bearing_deg(&trace.end);
        let (length_km, width_km) = rupture_dimensions(
            magnitude,
            dip_deg,
            self.layer_thickness(depth_top_km, depth_bottom_km),
            Some(trace_length),
        );
        let rupture = RuptureGeometry {
            length_km,
            width_km,
            dip_deg,
            azimuth_deg,
        };

        let half = length_km / 2.0;
        let along = uniform(half, trace_length - half, rng);
        let top_mid = trace.start.offset(azimuth_deg, along);
        let centroid = top_mid.offset(azimuth_deg + 90.0, rupture.surface_width_km() / 2.0);

        Event {
            id: EventId::new(0),
            source: source.id,
            recurrence_index,
            magnitude,
            centroid,
            depth_km: depth_top_km + rupture.vertical_extent_km() / 2.0,
            rupture,
            trace: Trace {
                start: top_mid.offset(azimuth_deg + 180.0, half),
                end: top_mid.offset(azimuth_deg, half),
            },
        }
    }

    fn sample_magnitude(&self, model: &GutenbergRichter, floor: f64, rng: &mut impl Rng) -> f64 {
        let lo = floor.max(model.min_magnitude).min(model.max_magnitude);
        let u: f64 = rng.random();
        match self.sampling {
            MagnitudeSampling::Uniform => lo + (model.max_magnitude - lo) * u,
            MagnitudeSampling::Recurrence => {
                let base = model.cdf(lo);
                model.inverse_cdf(base + u * (1.0 - base))
            }
        }
    }

    fn layer_thickness(&self, top_km: f64, bottom_km: f64) -> f64 {
        let thickness = bottom_km - top_km;
        if thickness > 0.0 {
            thickness
        } else {
            self.scaling.seismogenic_thickness_km
        }
    }
}

/// `lo + (hi - lo) * u` with a fresh uniform `u`; degenerate ranges return `lo`.
fn uniform(lo: f64, hi: f64, rng: &mut impl Rng) -> f64 {
    let u: f64 = rng.random();
    lo + (hi - lo) * u
}

fn sample_in_polygon(
    source: &Source,
    polygon: &crate::polygon::Polygon,
    rng: &mut impl Rng,
) -> Result<GeoPoint, SourceError> {
    let bounds = polygon.bounds().ok_or_else(|| SourceError::InvalidGeometry {
        source_name: source.name.clone(),
        reason: "zone polygon has no vertices".to_owned(),
    })?;
    for _ in 0..MAX_REJECTION_DRAWS {
        let point = GeoPoint::new(
            uniform(bounds.min_latitude, bounds.max_latitude, rng),
            uniform(bounds.min_longitude, bounds.max_longitude, rng),
        );
        if polygon.contains(&point) {
            return Ok(point);
        }
    }
    Err(SourceError::InvalidGeometry {
        source_name: source.name.clone(),
        reason: format!("no epicentre found inside zone after {MAX_REJECTION_DRAWS} draws"),
    })
}

/// Surface trace of the top edge of a rupture centred below `centroid`.
fn trace_from_centroid(centroid: GeoPoint, rupture: &RuptureGeometry) -> Trace {
    let top_mid = centroid.offset(rupture.azimuth_deg - 90.0, rupture.surface_width_km() / 2.0);
    let half = rupture.length_km / 2.0;
    Trace {
        start: top_mid.offset(rupture.azimuth_deg + 180.0, half),
        end: top_mid.offset(rupture.azimuth_deg, half),
    }
}
