//! The five-axis motion tensor.
//!
//! Ground-motion samples flow through the pipeline as
//! `[spawn, branch, site, event, period]` arrays. [`MotionTensor`] wraps an
//! [`Array5`] and exposes the axes by name so the ordering is checked at the
//! type level instead of by convention.

use ndarray::{Array5, ArrayView4, ArrayViewMut4, Axis};
use serde::{Deserialize, Serialize};

/// Errors raised when an array does not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// An axis length does not match what the operation requires.
    #[error("axis `{axis}` has length {actual}, expected {expected}")]
    AxisMismatch {
        /// Name of the offending axis.
        axis: &'static str,
        /// Length the operation required.
        expected: usize,
        /// Length that was found.
        actual: usize,
    },

    /// A flat buffer does not match the requested shape.
    #[error("buffer of length {len} cannot be shaped as {shape:?}")]
    BadBuffer {
        /// Length of the supplied buffer.
        len: usize,
        /// Requested shape.
        shape: [usize; 5],
    },
}

/// Axis lengths of a [`MotionTensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionShape {
    /// Number of spawns (discretised uncertainty samples).
    pub spawns: usize,
    /// Number of logic-tree branches (zero-padded to the global maximum).
    pub branches: usize,
    /// Number of sites.
    pub sites: usize,
    /// Number of events.
    pub events: usize,
    /// Number of spectral periods.
    pub periods: usize,
}

impl MotionShape {
    /// Shape as an `ndarray` dimension tuple.
    pub const fn dim(self) -> (usize, usize, usize, usize, usize) {
        (
            self.spawns,
            self.branches,
            self.sites,
            self.events,
            self.periods,
        )
    }

    /// Total number of cells.
    pub const fn len(self) -> usize {
        self.spawns * self.branches * self.sites * self.events * self.periods
    }

    /// Whether the shape has no cells.
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Number of pseudo-events (`spawn x branch x event`) per site and period.
    pub const fn pseudo_events(self) -> usize {
        self.spawns * self.branches * self.events
    }
}

/// Dense `[spawn, branch, site, event, period]` array of motion values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionTensor {
    data: Array5<f64>,
}

impl MotionTensor {
    /// Axis index of the spawn axis.
    pub const SPAWN: Axis = Axis(0);
    /// Axis index of the branch axis.
    pub const BRANCH: Axis = Axis(1);
    /// Axis index of the site axis.
    pub const SITE: Axis = Axis(2);
    /// Axis index of the event axis.
    pub const EVENT: Axis = Axis(3);
    /// Axis index of the period axis.
    pub const PERIOD: Axis = Axis(4);

    /// A zero-filled tensor.
    pub fn zeros(shape: MotionShape) -> Self {
        Self {
            data: Array5::zeros(shape.dim()),
        }
    }

    /// A tensor with every cell set to `value`.
    pub fn filled(shape: MotionShape, value: f64) -> Self {
        Self {
            data: Array5::from_elem(shape.dim(), value),
        }
    }

    /// Wrap an existing array; the array's axes are taken to be in canonical order.
    pub const fn from_array(data: Array5<f64>) -> Self {
        Self { data }
    }

    /// Build a tensor from a row-major buffer.
    pub fn from_vec(shape: MotionShape, values: Vec<f64>) -> Result<Self, ShapeError> {
        let len = values.len();
        Array5::from_shape_vec(shape.dim(), values)
            .map(|data| Self { data })
            .map_err(|_shape_err| ShapeError::BadBuffer {
                len,
                shape: [
                    shape.spawns,
                    shape.branches,
                    shape.sites,
                    shape.events,
                    shape.periods,
                ],
            })
    }

    /// Axis lengths.
    pub fn shape(&self) -> MotionShape {
        let (spawns, branches, sites, events, periods) = self.data.dim();
        MotionShape {
            spawns,
            branches,
            sites,
            events,
            periods,
        }
    }

    /// Value of one cell.
    pub fn get(&self, spawn: usize, branch: usize, site: usize, event: usize, period: usize) -> f64 {
        self.data[[spawn, branch, site, event, period]]
    }

    /// Set one cell.
    pub fn set(
        &mut self,
        spawn: usize,
        branch: usize,
        site: usize,
        event: usize,
        period: usize,
        value: f64,
    ) {
        self.data[[spawn, branch, site, event, period]] = value;
    }

    /// The `[spawn, branch, event, period]` view for one site.
    pub fn site(&self, site: usize) -> ArrayView4<'_, f64> {
        self.data.index_axis(Self::SITE, site)
    }

    /// Mutable `[spawn, branch, event, period]` view for one site.
    pub fn site_mut(&mut self, site: usize) -> ArrayViewMut4<'_, f64> {
        self.data.index_axis_mut(Self::SITE, site)
    }

    /// Borrow the underlying array.
    pub const fn data(&self) -> &Array5<f64> {
        &self.data
    }

    /// Mutably borrow the underlying array.
    pub fn data_mut(&mut self) -> &mut Array5<f64> {
        &mut self.data
    }

    /// Consume the tensor and return the underlying array.
    pub fn into_inner(self) -> Array5<f64> {
        self.data
    }

    /// Apply `f` to every cell in place.
    pub fn map_inplace(&mut self, f: impl FnMut(&mut f64)) {
        self.data.map_inplace(f);
    }

    /// Require a specific axis length.
    pub fn expect_axis(&self, axis: Axis, expected: usize) -> Result<(), ShapeError> {
        let actual = self.data.len_of(axis);
        if actual == expected {
            Ok(())
        } else {
            Err(ShapeError::AxisMismatch {
                axis: axis_name(axis),
                expected,
                actual,
            })
        }
    }

    /// Find the first non-finite cell, returning `(spawn, branch, site, event, period)`.
    pub fn first_non_finite(&self) -> Option<(usize, usize, usize, usize, usize)> {
        self.data
            .indexed_iter()
            .find(|(_, v)| !v.is_finite())
            .map(|(idx, _)| idx)
    }
}

/// Human-readable name of a canonical axis.
pub const fn axis_name(axis: Axis) -> &'static str {
    match axis.0 {
        0 => "spawn",
        1 => "branch",
        2 => "site",
        3 => "event",
        4 => "period",
        _ => "unknown",
    }
}
