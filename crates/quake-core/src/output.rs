//! Per-rank partial outputs and the merged run output.

use quake_types::{HazardResult, LossResult, MotionRecord};
use serde::{Deserialize, Serialize};

use crate::comm::RankReport;
use crate::error::RunError;
use crate::scheduler::{SiteBlock, SiteBlockScheduler};

/// Results for one rank's block of sites, indexed from the block start.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialOutput {
    /// The block these results cover.
    pub block: SiteBlock,
    /// Hazard curves for the block.
    pub hazard: Option<HazardResult>,
    /// Retained motion for the block.
    pub motion: Option<MotionRecord>,
    /// Loss values for the block.
    pub loss: Option<LossResult>,
}

/// Results of a whole run, keyed by global site index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Hazard curves, `[site, return_period, period]`.
    pub hazard: Option<HazardResult>,
    /// Retained motion, `[site, spawn, branch, event, period]`.
    pub motion: Option<MotionRecord>,
    /// Loss values, `[site, pseudo_event]`.
    pub loss: Option<LossResult>,
}

impl RunOutput {
    /// Stitch gathered rank reports into global site order.
    ///
    /// Every rank must have produced a result and each part must cover the
    /// block the scheduler assigns to its rank.
    pub fn merge(
        scheduler: &SiteBlockScheduler,
        reports: Vec<RankReport>,
    ) -> Result<Self, RunError> {
        let mut parts = Vec::with_capacity(reports.len());
        for report in reports {
            match report.outcome {
                Ok(part) => parts.push(part),
                Err(message) => {
                    return Err(RunError::RankFailed {
                        rank: report.rank,
                        message,
                    });
                }
            }
        }
        parts.sort_by_key(|part| part.block.rank);
        for (rank, part) in parts.iter().enumerate() {
            if part.block != scheduler.block(rank) {
                return Err(RunError::RankFailed {
                    rank: part.block.rank,
                    message: format!(
                        "covered sites {:?}, expected {:?}",
                        part.block.range(),
                        scheduler.block(rank).range()
                    ),
                });
            }
        }
        if parts.len() != scheduler.ranks() {
            return Err(RunError::RankFailed {
                rank: parts.len(),
                message: "no report received".to_owned(),
            });
        }

        let sites = scheduler.sites();
        let hazard = match parts.first().and_then(|p| p.hazard.as_ref()) {
            None => None,
            Some(first) => {
                let mut merged = HazardResult::zeros(
                    sites,
                    first.return_periods.clone(),
                    first.periods.clone(),
                );
                for part in &parts {
                    if let Some(block) = &part.hazard {
                        merged.write_block(part.block.start, block)?;
                    }
                }
                Some(merged)
            }
        };

        let motion_blocks: Vec<MotionRecord> =
            parts.iter().filter_map(|p| p.motion.clone()).collect();
        let motion = MotionRecord::concatenate(&motion_blocks)?;

        let loss = match parts.first().and_then(|p| p.loss.as_ref()) {
            None => None,
            Some(first) => {
                let mut merged = LossResult::zeros(sites, first.values.ncols());
                for part in &parts {
                    if let Some(block) = &part.loss {
                        merged.write_block(part.block.start, block)?;
                    }
                }
                Some(merged)
            }
        };

        Ok(Self {
            hazard,
            motion,
            loss,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ndarray::Array3;

    use super::*;

    fn part(scheduler: &SiteBlockScheduler, rank: usize) -> PartialOutput {
        let block = scheduler.block(rank);
        let values = Array3::from_elem((block.len, 1, 1), rank as f64);
        PartialOutput {
            block,
            hazard: Some(HazardResult {
                return_periods: vec![475.0],
                periods: vec![0.0],
                values,
            }),
            motion: None,
            loss: None,
        }
    }

    #[test]
    fn merge_writes_each_block_at_its_offset() {
        let scheduler = SiteBlockScheduler::new(5, 2).unwrap();
        let reports = vec![
            RankReport {
                rank: 1,
                outcome: Ok(part(&scheduler, 1)),
            },
            RankReport {
                rank: 0,
                outcome: Ok(part(&scheduler, 0)),
            },
        ];
        let merged = RunOutput::merge(&scheduler, reports).unwrap();
        let hazard = merged.hazard.unwrap();
        let column: Vec<f64> = hazard.values.iter().copied().collect();
        assert_eq!(column, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
        assert!(merged.motion.is_none());
    }

    #[test]
    fn a_failed_rank_fails_the_merge() {
        let scheduler = SiteBlockScheduler::new(4, 2).unwrap();
        let reports = vec![
            RankReport {
                rank: 0,
                outcome: Ok(part(&scheduler, 0)),
            },
            RankReport {
                rank: 1,
                outcome: Err("boom".to_owned()),
            },
        ];
        assert!(matches!(
            RunOutput::merge(&scheduler, reports),
            Err(RunError::RankFailed { rank: 1, .. })
        ));
    }

    #[test]
    fn merged_output_serialises_to_json() {
        let scheduler = SiteBlockScheduler::new(3, 1).unwrap();
        let reports = vec![RankReport {
            rank: 0,
            outcome: Ok(part(&scheduler, 0)),
        }];
        let merged = RunOutput::merge(&scheduler, reports).unwrap();
        let json = serde_json::to_string(&merged).unwrap();
        let parsed: RunOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, merged);
        assert!(json.contains("\"motion\":null"));
    }
}
