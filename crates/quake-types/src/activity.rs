//! Per-event annual occurrence rates.
//!
//! [`EventActivity`] is a dense `[spawn, branch, event]` array. The branch
//! axis is padded to the largest branch count of any source; padded slots
//! always carry activity 0 so they can never contribute to a rate.

use ndarray::{Array1, Array3, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::tensor::ShapeError;

/// Errors raised when activity values violate their invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActivityError {
    /// A cell is negative or not finite.
    #[error("invalid activity {value} at [spawn {spawn}, branch {branch}, event {event}]")]
    InvalidValue {
        /// Spawn index.
        spawn: usize,
        /// Branch index.
        branch: usize,
        /// Event index.
        event: usize,
        /// Offending value.
        value: f64,
    },

    /// Shapes did not line up.
    #[error("activity shape error: {source}")]
    Shape {
        /// The underlying shape error.
        #[from]
        source: ShapeError,
    },
}

/// Dense `[spawn, branch, event]` array of annual occurrence rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventActivity {
    data: Array3<f64>,
}

impl EventActivity {
    /// Wrap an array, rejecting negative or non-finite cells.
    pub fn from_array(data: Array3<f64>) -> Result<Self, ActivityError> {
        if let Some(((spawn, branch, event), &value)) = data
            .indexed_iter()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ActivityError::InvalidValue {
                spawn,
                branch,
                event,
                value,
            });
        }
        Ok(Self { data })
    }

    /// A single-spawn activity array built from per-branch, per-event rates.
    pub fn from_branch_rates(rates: Array3<f64>) -> Result<Self, ActivityError> {
        let spawns = rates.len_of(Axis(0));
        if spawns != 1 {
            return Err(ShapeError::AxisMismatch {
                axis: "spawn",
                expected: 1,
                actual: spawns,
            }
            .into());
        }
        Self::from_array(rates)
    }

    /// Number of spawns.
    pub fn spawns(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Number of (padded) branches.
    pub fn branches(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// Number of events.
    pub fn events(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Activity of one cell.
    pub fn get(&self, spawn: usize, branch: usize, event: usize) -> f64 {
        self.data[[spawn, branch, event]]
    }

    /// Borrow the underlying array.
    pub const fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Sum over every cell: the total annual rate represented by the array.
    pub fn total(&self) -> f64 {
        self.data.sum()
    }

    /// Expand a single-spawn array along the spawn axis.
    ///
    /// Each event's activity is multiplied by the matching spawn weight, so
    /// the total rate is unchanged when the weights sum to 1.
    pub fn with_spawn_weights(&self, weights: &[f64]) -> Result<Self, ActivityError> {
        if self.spawns() != 1 {
            return Err(ShapeError::AxisMismatch {
                axis: "spawn",
                expected: 1,
                actual: self.spawns(),
            }
            .into());
        }
        let base = self.data.index_axis(Axis(0), 0);
        let (_, branches, events) = self.data.dim();
        let data = Array3::from_shape_fn((weights.len(), branches, events), |(s, b, e)| {
            weights[s] * base[[b, e]]
        });
        Self::from_array(data)
    }

    /// Sum over the branch axis, leaving a single effective branch.
    ///
    /// Branch weights are already folded into the activity, so summing
    /// reproduces the per-event rate. Padded slots contribute 0.
    pub fn collapse_branches(&self) -> Self {
        let summed = self.data.sum_axis(Axis(1)).insert_axis(Axis(1));
        Self { data: summed }
    }

    /// Flatten `[spawn, branch, event]` into one pseudo-event axis in row-major order.
    pub fn flatten(&self) -> Array1<f64> {
        self.data.iter().copied().collect()
    }

    /// Per-event activity for one `(spawn, branch)` slot.
    pub fn lane(&self, spawn: usize, branch: usize) -> ArrayView1<'_, f64> {
        self.data.slice(ndarray::s![spawn, branch, ..])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ndarray::array;

    use super::*;

    fn two_branch() -> EventActivity {
        // branch 1 is padding for event 1 (its source has one branch).
        let rates = array![[[0.6, 0.5], [0.4, 0.0]]];
        EventActivity::from_branch_rates(rates).unwrap()
    }

    #[test]
    fn negative_activity_is_rejected() {
        let rates = array![[[0.1, -0.2]]];
        let err = EventActivity::from_array(rates);
        assert!(matches!(
            err,
            Err(ActivityError::InvalidValue { event: 1, .. })
        ));
    }

    #[test]
    fn spawn_expansion_preserves_total() {
        let activity = two_branch();
        let spawned = activity.with_spawn_weights(&[0.25, 0.5, 0.25]).unwrap();
        assert_eq!(spawned.spawns(), 3);
        assert!((spawned.total() - activity.total()).abs() < 1e-12);
        assert!((spawned.get(1, 0, 1) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn spawn_expansion_requires_single_spawn() {
        let spawned = two_branch().with_spawn_weights(&[0.5, 0.5]).unwrap();
        assert!(spawned.with_spawn_weights(&[1.0]).is_err());
    }

    #[test]
    fn collapse_sums_branches() {
        let collapsed = two_branch().collapse_branches();
        assert_eq!(collapsed.branches(), 1);
        assert!((collapsed.get(0, 0, 0) - 1.0).abs() < 1e-12);
        assert!((collapsed.get(0, 0, 1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn flatten_is_row_major() {
        let flat = two_branch().flatten();
        assert_eq!(flat.to_vec(), vec![0.6, 0.5, 0.4, 0.0]);
    }
}
