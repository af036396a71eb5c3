//! Site-block decomposition across ranks.
//!
//! `M` sites split across `P` ranks as `L = M / P` with remainder
//! `R = M - P·L`. Ranks below `R` take `L + 1` sites starting at `r·(L + 1)`;
//! the rest take `L` sites starting at `R·(L + 1) + (r − R)·L`. The split is
//! a pure function of `(M, P, rank)`, so the root can recompute every block
//! when stitching partial results back into global site order.

use crate::config::ConfigError;

/// A contiguous slice of the global site list owned by one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteBlock {
    /// Owning rank.
    pub rank: usize,
    /// Global index of the first site.
    pub start: usize,
    /// Number of sites.
    pub len: usize,
}

impl SiteBlock {
    /// One past the last global site index.
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// The global index range.
    pub const fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }

    /// Whether the block holds no sites.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Computes site blocks for a fixed site count and rank count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteBlockScheduler {
    sites: usize,
    ranks: usize,
}

impl SiteBlockScheduler {
    /// Create a scheduler; `ranks` must be at least 1.
    pub fn new(sites: usize, ranks: usize) -> Result<Self, ConfigError> {
        if ranks == 0 {
            return Err(ConfigError::Invalid {
                reason: "rank count must be at least 1".to_owned(),
            });
        }
        Ok(Self { sites, ranks })
    }

    /// Total number of sites.
    pub const fn sites(&self) -> usize {
        self.sites
    }

    /// Number of ranks.
    pub const fn ranks(&self) -> usize {
        self.ranks
    }

    /// The block owned by `rank`. Ranks past the last get an empty block.
    pub const fn block(&self, rank: usize) -> SiteBlock {
        if rank >= self.ranks {
            return SiteBlock {
                rank,
                start: self.sites,
                len: 0,
            };
        }
        let base = self.sites / self.ranks;
        let remainder = self.sites - self.ranks * base;
        if rank < remainder {
            SiteBlock {
                rank,
                start: rank * (base + 1),
                len: base + 1,
            }
        } else {
            SiteBlock {
                rank,
                start: remainder * (base + 1) + (rank - remainder) * base,
                len: base,
            }
        }
    }

    /// Every block in rank order.
    pub fn all_blocks(&self) -> Vec<SiteBlock> {
        (0..self.ranks).map(|rank| self.block(rank)).collect()
    }

    /// The slice of `items` owned by `rank`.
    pub fn slice<'a, T>(&self, items: &'a [T], rank: usize) -> &'a [T] {
        let block = self.block(rank);
        items.get(block.range()).unwrap_or(&[])
    }

    /// Reassemble per-rank parts, given in any order, into global site order.
    ///
    /// Each part is tagged with its rank. Returns `None` if a rank is missing
    /// or a part's length disagrees with its block.
    pub fn stitch<T>(&self, mut parts: Vec<(usize, Vec<T>)>) -> Option<Vec<T>> {
        if parts.len() != self.ranks {
            return None;
        }
        parts.sort_by_key(|(rank, _)| *rank);
        let mut out = Vec::with_capacity(self.sites);
        for (expected, (rank, items)) in parts.into_iter().enumerate() {
            if rank != expected || items.len() != self.block(rank).len {
                return None;
            }
            out.extend(items);
        }
        Some(out)
    }
}
