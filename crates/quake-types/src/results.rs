//! Result arrays produced by the pipeline.
//!
//! Every result is dense and keyed by global site index on its leading axis,
//! so per-rank partial results can be stitched back into global order by
//! writing each block at its offset.

use ndarray::{Array2, Array3, Array5, Axis, s};
use serde::{Deserialize, Serialize};

use crate::tensor::ShapeError;

/// Per-site, per-period intensity at each requested return period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardResult {
    /// Requested return periods in years.
    pub return_periods: Vec<f64>,
    /// Spectral periods in seconds.
    pub periods: Vec<f64>,
    /// Intensity in g, shaped `[site, return_period, period]`.
    pub values: Array3<f64>,
}

impl HazardResult {
    /// A zero-filled result for `sites` sites.
    pub fn zeros(sites: usize, return_periods: Vec<f64>, periods: Vec<f64>) -> Self {
        let values = Array3::zeros((sites, return_periods.len(), periods.len()));
        Self {
            return_periods,
            periods,
            values,
        }
    }

    /// Number of sites covered.
    pub fn sites(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    /// Copy a block of sites into this result starting at `offset`.
    pub fn write_block(&mut self, offset: usize, block: &Self) -> Result<(), ShapeError> {
        check_block(offset, block.sites(), self.sites())?;
        let end = offset + block.sites();
        self.values
            .slice_mut(s![offset..end, .., ..])
            .assign(&block.values);
        Ok(())
    }
}

/// Ground-motion samples retained for motion-only (scenario) runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionRecord {
    /// Spectral periods in seconds.
    pub periods: Vec<f64>,
    /// Motion in g, shaped `[site, spawn, branch, event, period]`.
    pub values: Array5<f64>,
}

impl MotionRecord {
    /// Number of sites covered.
    pub fn sites(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    /// Concatenate per-block records in site order.
    pub fn concatenate(blocks: &[Self]) -> Result<Option<Self>, ShapeError> {
        let Some(first) = blocks.first() else {
            return Ok(None);
        };
        let views: Vec<_> = blocks.iter().map(|b| b.values.view()).collect();
        let values = ndarray::concatenate(Axis(0), &views).map_err(|_shape_err| {
            ShapeError::AxisMismatch {
                axis: "site",
                expected: first.sites(),
                actual: blocks.iter().map(Self::sites).sum(),
            }
        })?;
        Ok(Some(Self {
            periods: first.periods.clone(),
            values,
        }))
    }
}

/// Loss values returned by the external loss engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossResult {
    /// Loss per site and pseudo-event, shaped `[site, pseudo_event]`.
    pub values: Array2<f64>,
}

impl LossResult {
    /// A zero-filled result.
    pub fn zeros(sites: usize, pseudo_events: usize) -> Self {
        Self {
            values: Array2::zeros((sites, pseudo_events)),
        }
    }

    /// Number of sites covered.
    pub fn sites(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    /// Copy a block of sites into this result starting at `offset`.
    pub fn write_block(&mut self, offset: usize, block: &Self) -> Result<(), ShapeError> {
        check_block(offset, block.sites(), self.sites())?;
        let end = offset + block.sites();
        self.values.slice_mut(s![offset..end, ..]).assign(&block.values);
        Ok(())
    }
}

fn check_block(offset: usize, block_sites: usize, total_sites: usize) -> Result<(), ShapeError> {
    if offset + block_sites > total_sites {
        return Err(ShapeError::AxisMismatch {
            axis: "site",
            expected: total_sites,
            actual: offset + block_sites,
        });
    }
    Ok(())
}
