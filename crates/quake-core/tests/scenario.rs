//! End-to-end runs of the hazard pipeline.
//!
//! Scenario runs check ground motion against closed-form model values;
//! hazard runs check that splitting sites across ranks changes nothing.

// Integration tests use unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(clippy::unwrap_used, clippy::float_cmp)]

use std::path::{Path, PathBuf};

use ndarray::{Array1, ArrayView2};
use quake_core::{
    ChannelCommunicator, HazardConfig, LossEngine, LossError, RunError, SingleRank, prepare, run,
    run_threaded,
};
use quake_motion::{DistanceMetric, ModelRegistry, MotionError, MultiModelEvaluator};
use quake_types::{GeoPoint, Site};
use tempfile::TempDir;

const EPICENTRE: GeoPoint = GeoPoint::new(-35.0, 149.0);

/// Periods of every scenario run, in seconds.
const PERIODS: [f64; 3] = [0.0, 0.2, 1.0];

fn scenario_yaml(magnitude: f64, sites: &[GeoPoint]) -> String {
    let mut yaml = format!(
        "
run:
  name: scenario
  mode: scenario
periods: [0.0, 0.2, 1.0]
sources:
  - name: capital
    kind: scenario
    magnitude: {magnitude}
    latitude: {lat}
    longitude: {lon}
    depth_km: 10.0
    ground_motion:
      - {{ model: toro97, weight: 1.0 }}
sites:
",
        lat = EPICENTRE.latitude,
        lon = EPICENTRE.longitude,
    );
    for site in sites {
        yaml.push_str(&format!(
            "  - {{ latitude: {}, longitude: {}, site_class: C }}\n",
            site.latitude, site.longitude
        ));
    }
    yaml
}

fn scenario_config(magnitude: f64, sites: &[GeoPoint], scratch: &TempDir) -> HazardConfig {
    let mut config = HazardConfig::parse(&scenario_yaml(magnitude, sites)).unwrap();
    config.run.output_dir = scratch.path().join("output");
    config
}

/// Amplification table whose ratio is `exp(ln_ratio)` everywhere.
fn uniform_amplification_table(dir: &Path, ln_ratio: f64) -> PathBuf {
    let table = dir.join("amplification.json");
    std::fs::write(
        &table,
        format!(
            r#"{{
            "site_classes": ["C"],
            "magnitudes": [6.0],
            "pga_bins": [0.1],
            "periods": [0.0, 1.0],
            "ln_mean": [[[[{ln_ratio}, {ln_ratio}]]]],
            "ln_sigma": [[[[0.0, 0.0]]]]
        }}"#
        ),
    )
    .unwrap();
    table
}

fn three_sites() -> Vec<GeoPoint> {
    vec![
        EPICENTRE.offset(90.0, 15.0),
        EPICENTRE.offset(200.0, 40.0),
        EPICENTRE.offset(315.0, 120.0),
    ]
}

/// Toro (1997) mid-continent rows for 0, 0.2 and 1.0 s:
/// c1, c2, c3, c4, c5, c6, c7, ln sigma.
const TORO97_ROWS: [[f64; 8]; 3] = [
    [2.20, 0.81, 0.00, 1.27, 1.16, 0.0021, 9.3, 0.75],
    [1.73, 0.84, 0.00, 0.98, 0.66, 0.0042, 7.5, 0.71],
    [0.09, 1.42, -0.20, 0.90, 0.49, 0.0023, 6.8, 0.80],
];

/// Toro (1997) ln spectral acceleration, written out term by term.
fn toro97_ln_sa(row: &[f64; 8], magnitude: f64, rjb: f64) -> f64 {
    let [c1, c2, c3, c4, c5, c6, c7, _] = *row;
    let dm = magnitude - 6.0;
    let r_m = rjb.hypot(c7);
    let far = (r_m / 100.0).ln().max(0.0);
    c1 + c2 * dm + c3 * dm * dm - c4 * r_m.ln() - (c5 - c4) * far - c6 * r_m
}

#[test]
fn scenario_motion_matches_closed_form() {
    let scratch = TempDir::new().unwrap();
    let config = scenario_config(6.5, &three_sites(), &scratch);
    let prepared = prepare(&config, &ModelRegistry::builtin()).unwrap();
    let event = &prepared.catalog.events()[0];

    let output = run(&config, &SingleRank, uuid::Uuid::now_v7(), None)
        .unwrap()
        .unwrap();
    assert!(output.hazard.is_none());
    let motion = output.motion.unwrap();
    assert_eq!(motion.values.dim(), (3, 1, 1, 1, PERIODS.len()));

    let evaluator =
        MultiModelEvaluator::new(prepared.models.clone(), prepared.tree.clone(), config.periods)
            .unwrap();
    let log = evaluator.evaluate(&prepared.sites, &prepared.catalog).unwrap();

    for (i, site) in prepared.sites.iter().enumerate() {
        let rjb = DistanceMetric::JoynerBoore.distance_km(&site.location, event);
        for (p, row) in TORO97_ROWS.iter().enumerate() {
            let ln_mean = toro97_ln_sa(row, 6.5, rjb);
            let evaluated = log.log_mean.get(0, 0, i, 0, p);
            assert!(
                (evaluated - ln_mean).abs() <= 1e-12,
                "site {i}, period {}: ln mean {evaluated} != {ln_mean}",
                PERIODS[p]
            );
            assert_eq!(log.log_sigma.get(0, 0, i, 0, p), row[7]);

            let expected = ln_mean.exp();
            let actual = motion.values[[i, 0, 0, 0, p]];
            assert!(
                (actual - expected).abs() <= 1e-12 * expected,
                "site {i}, period {}: {actual} != {expected}",
                PERIODS[p]
            );
        }
    }
}

#[test]
fn zero_magnitude_fails_before_any_motion() {
    let scratch = TempDir::new().unwrap();
    let config = scenario_config(0.0, &three_sites(), &scratch);
    let prepared = prepare(&config, &ModelRegistry::builtin()).unwrap();
    let evaluator =
        MultiModelEvaluator::new(prepared.models.clone(), prepared.tree.clone(), config.periods)
            .unwrap();
    let result = evaluator.evaluate(&prepared.sites, &prepared.catalog);
    assert!(matches!(
        result,
        Err(MotionError::DegenerateMagnitude { magnitude, .. }) if magnitude == 0.0
    ));

    let config = scenario_config(0.0, &three_sites(), &scratch);
    let outcome = run(&config, &SingleRank, uuid::Uuid::now_v7(), None);
    assert!(matches!(outcome, Err(RunError::RankFailed { rank: 0, .. })));
}

#[test]
fn events_past_the_distance_threshold_give_exactly_zero() {
    let scratch = TempDir::new().unwrap();
    let sites = [EPICENTRE.offset(90.0, 49.0), EPICENTRE.offset(90.0, 51.0)];
    let mut config = scenario_config(6.0, &sites, &scratch);
    config.ground_motion.spectral.distance_threshold_km = Some(50.0);

    let output = run_threaded(&config, None).unwrap();
    let motion = output.motion.unwrap();
    assert!(motion.values[[0, 0, 0, 0, 0]] > 0.0);
    for p in 0..PERIODS.len() {
        assert_eq!(motion.values[[1, 0, 0, 0, p]].to_bits(), 0.0_f64.to_bits());
    }
}

#[test]
fn amplification_below_the_floor_rescales_bedrock_exactly() {
    let scratch = TempDir::new().unwrap();
    // Every ratio is exp(ln 0.5) = 0.5, below the 0.6 floor.
    let table = uniform_amplification_table(scratch.path(), -0.693_147_180_559_945_3);

    let bedrock_config = scenario_config(6.0, &three_sites(), &scratch);
    let bedrock = run_threaded(&bedrock_config, None).unwrap().motion.unwrap();

    let mut soil_config = bedrock_config.clone();
    soil_config.amplification.enabled = true;
    soil_config.amplification.table = Some(table);
    soil_config.amplification.bounds.min_factor = 0.6;
    let soil = run_threaded(&soil_config, None).unwrap().motion.unwrap();

    assert_eq!(soil.values.dim(), bedrock.values.dim());
    for (s, b) in soil.values.iter().zip(bedrock.values.iter()) {
        assert_eq!(s.to_bits(), (b * 0.6).to_bits());
    }
}

#[test]
fn pga_cutoff_caps_amplified_soil_motion() {
    let scratch = TempDir::new().unwrap();
    // Every ratio is exp(ln 3) = 3.
    let table = uniform_amplification_table(scratch.path(), 3.0_f64.ln());
    let sites = [EPICENTRE.offset(90.0, 5.5)];

    let mut bedrock_config = scenario_config(7.0, &sites, &scratch);
    bedrock_config.ground_motion.spectral.pga_cutoff = Some(0.1);
    let bedrock = run_threaded(&bedrock_config, None).unwrap().motion.unwrap();
    assert_eq!(bedrock.values[[0, 0, 0, 0, 0]], 0.1);

    let mut soil_config = bedrock_config.clone();
    soil_config.amplification.enabled = true;
    soil_config.amplification.table = Some(table);
    let soil = run_threaded(&soil_config, None).unwrap().motion.unwrap();

    let soil_pga = soil.values[[0, 0, 0, 0, 0]];
    assert!(soil_pga <= 0.1, "soil PGA {soil_pga} exceeds the 0.1 g cutoff");
    // A uniform ratio scaled back to the cap leaves the capped bedrock spectrum.
    for p in 0..PERIODS.len() {
        let s = soil.values[[0, 0, 0, 0, p]];
        let b = bedrock.values[[0, 0, 0, 0, p]];
        assert!((s - b).abs() <= 1e-12 * b, "period {}: {s} != {b}", PERIODS[p]);
    }
}

#[test]
fn a_rank_that_cannot_prepare_still_reports_to_the_root() {
    let scratch = TempDir::new().unwrap();
    let config = scenario_config(6.0, &three_sites(), &scratch);
    let mut broken = config.clone();
    broken.amplification.enabled = true;
    broken.amplification.table = Some(scratch.path().join("missing.json"));
    let broken = &broken;

    let run_id = uuid::Uuid::now_v7();
    let mut group = ChannelCommunicator::group(2);
    let leaf = group.pop().unwrap();
    let root = group.pop().unwrap();

    let (root_result, leaf_result) = std::thread::scope(|scope| {
        let handle = scope.spawn(move || run(broken, &leaf, run_id, None));
        let root_result = run(&config, &root, run_id, None);
        (root_result, handle.join().unwrap())
    });
    assert!(matches!(root_result, Err(RunError::RankFailed { rank: 1, .. })));
    assert!(matches!(leaf_result, Err(RunError::Motion { .. })));
}

fn hazard_config(ranks: usize, scratch: &TempDir) -> HazardConfig {
    let yaml = "
run:
  name: capital-hazard
  seed: 11
periods: [0.0, 0.2, 1.0]
return_periods: [100.0, 475.0, 2475.0]
ground_motion:
  variability: { method: spawn, bins: 3 }
sources:
  - name: capital
    kind: zone
    polygon:
      - { latitude: -36.0, longitude: 148.0 }
      - { latitude: -36.0, longitude: 150.0 }
      - { latitude: -34.0, longitude: 150.0 }
      - { latitude: -34.0, longitude: 148.0 }
    depth_top_km: 2.0
    depth_bottom_km: 12.0
    number_of_events: 60
    recurrence:
      - { min_magnitude: 4.5, max_magnitude: 7.0, a_min: 0.3, b_value: 1.0 }
    ground_motion:
      - { model: toro97, weight: 0.6 }
      - { model: atkinson_boore95, weight: 0.4 }
  - name: lakes
    kind: fault
    trace:
      start: { latitude: -35.5, longitude: 148.5 }
      end: { latitude: -35.2, longitude: 148.9 }
    dip_deg: 60.0
    depth_bottom_km: 15.0
    number_of_events: 30
    recurrence:
      - { min_magnitude: 5.0, max_magnitude: 7.2, a_min: 0.02, b_value: 0.9 }
    ground_motion:
      - { model: atkinson_boore95, weight: 1.0 }
";
    let mut config = HazardConfig::parse(yaml).unwrap();
    config.sites = (0..7_u8)
        .map(|i| {
            let p = EPICENTRE.offset(40.0 * f64::from(i), 10.0 + 15.0 * f64::from(i));
            quake_core::config::SiteDefinition {
                latitude: p.latitude,
                longitude: p.longitude,
                site_class: "C".to_owned(),
                vs30: None,
                inventory: None,
            }
        })
        .collect();
    config.run.ranks = ranks;
    config.run.output_dir = scratch.path().join("output");
    config
}

#[test]
fn multi_rank_run_matches_single_rank() {
    let scratch = TempDir::new().unwrap();
    let single = run_threaded(&hazard_config(1, &scratch), None).unwrap();
    for ranks in [2, 3, 7, 9] {
        let split = run_threaded(&hazard_config(ranks, &scratch), None).unwrap();
        assert_eq!(split, single, "ranks = {ranks}");
    }
    let hazard = single.hazard.unwrap();
    assert_eq!(hazard.values.dim(), (7, 3, 3));
}

#[test]
fn longer_return_periods_never_lower_intensity() {
    let scratch = TempDir::new().unwrap();
    let hazard = run_threaded(&hazard_config(2, &scratch), None)
        .unwrap()
        .hazard
        .unwrap();
    for site in 0..7 {
        for period in 0..3 {
            let curve: Vec<f64> = (0..3).map(|rp| hazard.values[[site, rp, period]]).collect();
            assert!(curve.windows(2).all(|w| w[1] >= w[0]), "site {site}: {curve:?}");
            assert!(curve[0] > 0.0);
        }
    }
}

/// Reports peak spectral acceleration as the loss of each pseudo-event.
struct PeakSa;

impl LossEngine for PeakSa {
    fn assess(
        &self,
        _site: &Site,
        sa: ArrayView2<'_, f64>,
        magnitudes: &[f64],
        _bridge_period_indices: &[usize],
    ) -> Result<Array1<f64>, LossError> {
        assert_eq!(sa.nrows(), magnitudes.len());
        Ok(sa
            .rows()
            .into_iter()
            .map(|row| row.iter().copied().fold(0.0, f64::max))
            .collect())
    }
}

#[test]
fn loss_values_are_stitched_per_site_and_pseudo_event() {
    let scratch = TempDir::new().unwrap();
    let mut config = hazard_config(3, &scratch);
    config.output.save_motion = true;
    let output = run_threaded(&config, Some(&PeakSa)).unwrap();
    let loss = output.loss.unwrap();
    let motion = output.motion.unwrap();
    let (sites, spawns, branches, events, _) = motion.values.dim();
    assert_eq!(loss.values.dim(), (sites, spawns * branches * events));
    assert_eq!(spawns, 3);
    assert_eq!(branches, 1);

    let peak = motion.values[[4, 1, 0, 2, 0]]
        .max(motion.values[[4, 1, 0, 2, 1]])
        .max(motion.values[[4, 1, 0, 2, 2]]);
    assert_eq!(loss.values[[4, events + 2]], peak);
}

#[test]
fn random_sampling_is_rejected_for_hazard_runs() {
    let scratch = TempDir::new().unwrap();
    let mut config = hazard_config(1, &scratch);
    config.ground_motion.variability = quake_motion::VariabilityMethod::Random;
    assert!(matches!(
        run_threaded(&config, None),
        Err(RunError::Config { .. })
    ));
}
