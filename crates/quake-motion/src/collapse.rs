//! Logic-tree collapse across the branch axis.
//!
//! Weighted-sum collapse reduces `[spawn, branch, site, event, period]` to a
//! single effective branch per event, using the branch weights of the event's
//! own source. Padded slots are skipped entirely rather than summed in as
//! zero-valued branches.

use ndarray::{Array5, Zip, s};
use quake_types::{EventActivity, EventCatalog, LogicTree, MotionTensor};
use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// How the branch axis is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseMode {
    /// Reduce to one effective branch by weighted sum.
    #[default]
    WeightedSum,
    /// Keep every branch.
    PassThrough,
}

/// Collapses motion and activity across logic-tree branches.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicTreeCollapser {
    mode: CollapseMode,
}

impl LogicTreeCollapser {
    /// Create a collapser.
    pub const fn new(mode: CollapseMode) -> Self {
        Self { mode }
    }

    /// The configured mode.
    pub const fn mode(&self) -> CollapseMode {
        self.mode
    }

    /// Collapse motion; `catalog` supplies each event's source.
    pub fn collapse_motion(
        &self,
        motion: &MotionTensor,
        tree: &LogicTree,
        catalog: &EventCatalog,
    ) -> Result<MotionTensor, MotionError> {
        motion.expect_axis(MotionTensor::EVENT, catalog.len())?;
        motion.expect_axis(MotionTensor::BRANCH, tree.max_branches())?;
        if self.mode == CollapseMode::PassThrough {
            return Ok(motion.clone());
        }

        let shape = motion.shape();
        let mut out = Array5::zeros((shape.spawns, 1, shape.sites, shape.events, shape.periods));
        for event in catalog {
            let Some(set) = tree.branches(event.source) else {
                continue;
            };
            let e = event.id.index();
            let mut target = out.slice_mut(s![.., 0, .., e, ..]);
            for (b, branch) in set.iter().enumerate() {
                let lane = motion.data().slice(s![.., b, .., e, ..]);
                Zip::from(&mut target)
                    .and(&lane)
                    .for_each(|t, &x| *t += branch.weight * x);
            }
        }
        Ok(MotionTensor::from_array(out))
    }

    /// Collapse activity to pair with [`Self::collapse_motion`].
    ///
    /// Branch weights are already folded into the activity, so the weighted
    /// sum pairs with a plain sum over branches.
    pub fn collapse_activity(&self, activity: &EventActivity) -> EventActivity {
        match self.mode {
            CollapseMode::WeightedSum => activity.collapse_branches(),
            CollapseMode::PassThrough => activity.clone(),
        }
    }

    /// Number of branches after collapsing `branches`.
    pub const fn output_branches(&self, branches: usize) -> usize {
        match self.mode {
            CollapseMode::WeightedSum => 1,
            CollapseMode::PassThrough => branches,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ndarray::Array3;
    use quake_types::{
        BranchSet, Event, EventId, GeoPoint, ModelId, MotionShape, RuptureGeometry, SourceId,
        Trace,
    };

    use super::*;

    fn catalog() -> EventCatalog {
        let centroid = GeoPoint::new(0.0, 0.0);
        let event = |source: usize| Event {
            id: EventId::new(0),
            source: SourceId::new(source),
            recurrence_index: 0,
            magnitude: 6.0,
            centroid,
            depth_km: 10.0,
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
        };
        EventCatalog::new(vec![event(0), event(1)])
    }

    fn tree() -> LogicTree {
        LogicTree::new(vec![
            BranchSet::new(&[(ModelId::new(0), 0.25), (ModelId::new(1), 0.75)]).unwrap(),
            BranchSet::single(ModelId::new(0)),
        ])
    }

    #[test]
    fn single_branch_of_weight_one_is_identity() {
        let one = LogicTree::new(vec![BranchSet::single(ModelId::new(0)); 2]);
        let shape = MotionShape {
            spawns: 2,
            branches: 1,
            sites: 3,
            events: 2,
            periods: 4,
        };
        let values: Vec<f64> = (0..shape.len()).map(|i| 0.013 * i as f64 + 0.001).collect();
        let motion = MotionTensor::from_vec(shape, values).unwrap();
        let out = LogicTreeCollapser::default()
            .collapse_motion(&motion, &one, &catalog())
            .unwrap();
        assert_eq!(out, motion);
    }

    #[test]
    fn padded_branches_do_not_bias_the_sum() {
        let shape = MotionShape {
            spawns: 1,
            branches: 2,
            sites: 1,
            events: 2,
            periods: 1,
        };
        // Event 1's source has a single branch; its padded slot holds junk.
        let motion = MotionTensor::from_vec(shape, vec![0.2, 0.4, 0.6, 99.0]).unwrap();
        let out = LogicTreeCollapser::default()
            .collapse_motion(&motion, &tree(), &catalog())
            .unwrap();
        assert!((out.get(0, 0, 0, 0, 0) - (0.25 * 0.2 + 0.75 * 0.6)).abs() < 1e-12);
        assert!((out.get(0, 0, 0, 1, 0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn pass_through_keeps_branches() {
        let shape = MotionShape {
            spawns: 1,
            branches: 2,
            sites: 1,
            events: 2,
            periods: 1,
        };
        let motion = MotionTensor::filled(shape, 0.3);
        let collapser = LogicTreeCollapser::new(CollapseMode::PassThrough);
        let out = collapser.collapse_motion(&motion, &tree(), &catalog()).unwrap();
        assert_eq!(out, motion);
        assert_eq!(collapser.output_branches(2), 2);
    }

    #[test]
    fn activity_collapse_sums_branches() {
        let rates = Array3::from_shape_vec((1, 2, 2), vec![0.025, 0.3, 0.075, 0.0]).unwrap();
        let activity = EventActivity::from_branch_rates(rates).unwrap();
        let collapsed = LogicTreeCollapser::default().collapse_activity(&activity);
        assert!((collapsed.get(0, 0, 0) - 0.1).abs() < 1e-12);
        assert!((collapsed.get(0, 0, 1) - 0.3).abs() < 1e-12);
    }
}
