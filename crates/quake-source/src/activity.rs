//! Event activity construction.
//!
//! The base annual rate of each synthetic event comes from binning the events
//! of every recurrence model into equal-width magnitude bins over
//! `[min_generation_magnitude, mmax]`: an event in bin `j` of model `k`
//! receives `w_k * rate_k(bin j) / count_k(bin j)`, so the base activity of a
//! source sums to its total rate above the generation magnitude. Scenario
//! events carry activity 1.
//!
//! The base rate is then spread over the logic-tree branch axis by the
//! source's branch weights. Branch slots beyond the source's own branch count
//! carry 0.

use ndarray::Array3;
use quake_types::{EventActivity, EventCatalog, LogicTree};
use tracing::{debug, warn};

use crate::error::SourceError;
use crate::source::{Source, SourceKind};

/// Default number of magnitude bins per recurrence model.
pub const DEFAULT_MAGNITUDE_BINS: usize = 10;

/// Build the `[1, max_branches, event]` activity array for a catalog.
///
/// Every source must already have its events assigned. Events not assigned
/// to any source get activity 0.
pub fn build_event_activity(
    sources: &[Source],
    catalog: &EventCatalog,
    magnitude_bins: usize,
    tree: &LogicTree,
) -> Result<EventActivity, SourceError> {
    if tree.sources() != sources.len() {
        return Err(SourceError::DataUnavailable {
            what: format!(
                "logic-tree branches for {} sources (have {})",
                sources.len(),
                tree.sources()
            ),
        });
    }

    let base = base_rates(sources, catalog, magnitude_bins.max(1))?;
    if base.dropped > 0.0 {
        debug!(dropped_rate = base.dropped, "Rate of empty magnitude bins left out of activity");
    }
    let branches = tree.max_branches();
    let mut data = Array3::<f64>::zeros((1, branches, catalog.len()));

    for event in catalog {
        let Some(set) = tree.branches(event.source) else {
            continue;
        };
        let rate = base.rates[event.id.index()];
        for (b, branch) in set.iter().enumerate() {
            data[[0, b, event.id.index()]] = rate * branch.weight;
        }
    }

    let activity = EventActivity::from_branch_rates(data)?;
    debug!(
        events = activity.events(),
        branches = activity.branches(),
        total_rate = activity.total(),
        "Event activity built"
    );
    Ok(activity)
}

/// Per-event base rates before branch weighting.
#[derive(Debug)]
struct BaseRates {
    /// Annual rate of each event, indexed by event id.
    rates: Vec<f64>,
    /// Rate of magnitude bins that received no event.
    dropped: f64,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn base_rates(
    sources: &[Source],
    catalog: &EventCatalog,
    bins: usize,
) -> Result<BaseRates, SourceError> {
    let mut base = vec![0.0; catalog.len()];
    let mut dropped = 0.0;

    for source in sources {
        let ids = match source.event_ids() {
            Ok(ids) => ids,
            Err(SourceError::NotAssigned { .. }) => continue,
            Err(err) => return Err(err),
        };

        if matches!(source.kind, SourceKind::Scenario(_)) {
            for id in ids {
                base[id.index()] = 1.0;
            }
            continue;
        }

        let lo = source.min_generation_magnitude;
        for (k, (model, weight)) in source
            .recurrence
            .models()
            .iter()
            .zip(source.recurrence.weights())
            .enumerate()
        {
            let hi = model.max_magnitude;
            if hi <= lo {
                continue;
            }
            let width = (hi - lo) / bins as f64;
            let bin_of = |m: f64| (((m - lo) / width).floor().max(0.0) as usize).min(bins - 1);
            let bin_rate = |j: usize| {
                let bin_lo = lo + width * j as f64;
                let bin_hi = if j + 1 == bins { hi } else { bin_lo + width };
                weight * model.rate_between(bin_lo, bin_hi)
            };

            let members: Vec<usize> = ids
                .iter()
                .map(|id| id.index())
                .filter(|&i| catalog.events()[i].recurrence_index == k)
                .collect();

            let mut counts = vec![0_usize; bins];
            for &i in &members {
                counts[bin_of(catalog.events()[i].magnitude)] += 1;
            }

            for &i in &members {
                let j = bin_of(catalog.events()[i].magnitude);
                base[i] = bin_rate(j) / counts[j] as f64;
            }

            let empty: f64 = (0..bins)
                .filter(|&j| counts[j] == 0)
                .map(bin_rate)
                .sum();
            if empty > 0.0 {
                warn!(
                    source = %source.name,
                    recurrence_model = k,
                    dropped_rate = empty,
                    "Magnitude bins without events"
                );
                dropped += empty;
            }
        }
    }

    Ok(BaseRates {
        rates: base,
        dropped,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use quake_types::{BranchSet, GeoPoint, ModelId, SourceId};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::generator::{EventGenerator, GenerationMode};
    use crate::polygon::Polygon;
    use crate::recurrence::GutenbergRichter;
    use crate::source::{BranchDefinition, ScenarioRupture, SourceDefinition};

    fn zone_source(id: usize, branches: BranchSet) -> Source {
        zone_source_with_events(id, branches, 300)
    }

    fn zone_source_with_events(id: usize, branches: BranchSet, events: usize) -> Source {
        let definition = SourceDefinition {
            name: format!("zone-{id}"),
            kind: SourceKind::Zone {
                polygon: Polygon::new(vec![
                    GeoPoint::new(-36.0, 148.0),
                    GeoPoint::new(-36.0, 150.0),
                    GeoPoint::new(-34.0, 150.0),
                    GeoPoint::new(-34.0, 148.0),
                ]),
                depth_top_km: 5.0,
                depth_bottom_km: 10.0,
                dip_range_deg: [45.0, 45.0],
                azimuth_range_deg: [0.0, 180.0],
            },
            recurrence: vec![GutenbergRichter {
                min_magnitude: 4.5,
                max_magnitude: 7.0,
                a_min: 0.2,
                b_value: 1.0,
                weight: 1.0,
            }],
            min_generation_magnitude: None,
            number_of_events: events,
            ground_motion: vec![BranchDefinition {
                model: "toro97".to_owned(),
                weight: 1.0,
            }],
        };
        Source::new(SourceId::new(id), &definition, branches).unwrap()
    }

    #[test]
    fn zone_activity_sums_to_total_rate() {
        let sources = vec![zone_source(0, BranchSet::single(ModelId::new(0)))];
        let tree = LogicTree::new(vec![sources[0].branches.clone()]);
        let catalog = EventGenerator::default()
            .generate(
                GenerationMode::Synthetic,
                &sources,
                &mut SmallRng::seed_from_u64(11),
            )
            .unwrap();
        let activity =
            build_event_activity(&sources, &catalog, DEFAULT_MAGNITUDE_BINS, &tree).unwrap();
        assert!((activity.total() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn empty_magnitude_bins_account_for_the_missing_rate() {
        let sources = vec![zone_source_with_events(0, BranchSet::single(ModelId::new(0)), 3)];
        let catalog = EventGenerator::default()
            .generate(
                GenerationMode::Synthetic,
                &sources,
                &mut SmallRng::seed_from_u64(11),
            )
            .unwrap();
        let base = base_rates(&sources, &catalog, DEFAULT_MAGNITUDE_BINS).unwrap();
        let assigned: f64 = base.rates.iter().sum();
        assert!(base.dropped > 0.0);
        assert!(assigned < 0.2);
        assert!((assigned + base.dropped - 0.2).abs() < 1e-9);
    }

    #[test]
    fn branch_weights_split_rates_and_padding_is_zero() {
        let two = BranchSet::new(&[(ModelId::new(0), 0.7), (ModelId::new(1), 0.3)]).unwrap();
        let sources = vec![
            zone_source(0, two),
            zone_source(1, BranchSet::single(ModelId::new(1))),
        ];
        let tree = LogicTree::new(sources.iter().map(|s| s.branches.clone()).collect());
        let catalog = EventGenerator::default()
            .generate(
                GenerationMode::Synthetic,
                &sources,
                &mut SmallRng::seed_from_u64(5),
            )
            .unwrap();
        let activity = build_event_activity(&sources, &catalog, 5, &tree).unwrap();
        assert_eq!(activity.branches(), 2);

        for event in &catalog {
            let e = event.id.index();
            if event.source == SourceId::new(0) {
                let ratio = activity.get(0, 0, e) / (activity.get(0, 0, e) + activity.get(0, 1, e));
                assert!((ratio - 0.7).abs() < 1e-12);
            } else {
                assert!(activity.get(0, 1, e).abs() < f64::EPSILON);
                assert!(activity.get(0, 0, e) > 0.0);
            }
        }
        assert!((activity.total() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn scenario_events_have_unit_activity() {
        let definition = SourceDefinition {
            name: "scenario".to_owned(),
            kind: SourceKind::Scenario(ScenarioRupture {
                magnitude: 6.0,
                latitude: -35.0,
                longitude: 149.0,
                depth_km: 10.0,
                azimuth_deg: 0.0,
                dip_deg: 90.0,
                count: 2,
            }),
            recurrence: Vec::new(),
            min_generation_magnitude: None,
            number_of_events: 0,
            ground_motion: Vec::new(),
        };
        let sources = vec![
            Source::new(
                SourceId::new(0),
                &definition,
                BranchSet::single(ModelId::new(0)),
            )
            .unwrap(),
        ];
        let tree = LogicTree::new(vec![sources[0].branches.clone()]);
        let catalog = EventGenerator::default()
            .generate(
                GenerationMode::Scenario,
                &sources,
                &mut SmallRng::seed_from_u64(0),
            )
            .unwrap();
        let activity = build_event_activity(&sources, &catalog, 1, &tree).unwrap();
        assert_eq!(activity.flatten().to_vec(), vec![1.0, 1.0]);
    }
}
