//! Per-run context passed through the pipeline.
//!
//! A [`RunContext`] is created when a rank starts, borrowed by every stage,
//! and consumed by [`RunContext::finish`] when the rank is done. It holds
//! everything that would otherwise be process-global: run identity, seed,
//! output location, rank layout, and the unique-name counter.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

/// Identity and shared settings of one rank's view of a run.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    seed: u64,
    output_dir: PathBuf,
    rank: usize,
    size: usize,
    names: AtomicUsize,
}

impl RunContext {
    /// Create a context for `rank` of `size`.
    ///
    /// All ranks of one run share `run_id`.
    pub fn new(run_id: Uuid, seed: u64, output_dir: &Path, rank: usize, size: usize) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            seed,
            output_dir: output_dir.to_path_buf(),
            rank,
            size,
            names: AtomicUsize::new(0),
        }
    }

    /// A fresh, time-ordered run identifier.
    pub fn new_run_id() -> Uuid {
        Uuid::now_v7()
    }

    /// Run identifier.
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// When this rank started.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Base random seed.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Directory for result files.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// This rank's index.
    pub const fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Whether this is the root rank.
    pub const fn is_root(&self) -> bool {
        self.rank == 0
    }

    /// A name unique within this rank, tagged with the rank.
    pub fn next_name(&self, prefix: &str) -> String {
        let n = self.names.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}_r{}_{n}", self.rank)
    }

    /// Seed for the random stream of one global site.
    ///
    /// Depends only on the base seed and the site index, so per-site draws
    /// do not depend on how sites are split across ranks.
    pub const fn site_seed(&self, global_site: usize) -> u64 {
        self.seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(global_site as u64)
    }

    /// Tear down the context, logging the elapsed time.
    pub fn finish(self) {
        let elapsed = Utc::now() - self.started_at;
        info!(
            run_id = %self.run_id,
            rank = self.rank,
            elapsed_ms = elapsed.num_milliseconds(),
            "Rank finished"
        );
    }
}
