//! Sparse logic-tree branch mapping.
//!
//! Each source declares its own list of ground-motion models and weights.
//! Branch `b` of a source refers to the `b`-th model it declares; the dense
//! branch axis used by tensors is padded to [`LogicTree::max_branches`],
//! and slots past a source's own count are never treated as real branches.

use serde::{Deserialize, Serialize};

use crate::ids::{ModelId, SourceId};
use crate::weights::{WeightError, normalize_weights};

/// One logic-tree branch: a model and its normalised weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// The ground-motion model evaluated on this branch.
    pub model: ModelId,
    /// Normalised branch weight.
    pub weight: f64,
}

/// The branches declared by one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSet {
    branches: Vec<Branch>,
}

impl BranchSet {
    /// Build a branch set, normalising the raw weights.
    pub fn new(raw: &[(ModelId, f64)]) -> Result<Self, WeightError> {
        let weights: Vec<f64> = raw.iter().map(|(_, w)| *w).collect();
        let normalised = normalize_weights(&weights)?;
        let branches = raw
            .iter()
            .zip(normalised)
            .map(|(&(model, _), weight)| Branch { model, weight })
            .collect();
        Ok(Self { branches })
    }

    /// A single branch of weight 1.
    pub fn single(model: ModelId) -> Self {
        Self {
            branches: vec![Branch { model, weight: 1.0 }],
        }
    }

    /// Number of declared branches.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Whether no branches are declared.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// The branch at `index`, or `None` for a padded slot.
    pub fn get(&self, index: usize) -> Option<&Branch> {
        self.branches.get(index)
    }

    /// Iterate declared branches.
    pub fn iter(&self) -> std::slice::Iter<'_, Branch> {
        self.branches.iter()
    }
}

/// Branch sets for every source in a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicTree {
    per_source: Vec<BranchSet>,
    max_branches: usize,
}

impl LogicTree {
    /// Build the tree from per-source branch sets in source order.
    pub fn new(per_source: Vec<BranchSet>) -> Self {
        let max_branches = per_source.iter().map(BranchSet::len).max().unwrap_or(0);
        Self {
            per_source,
            max_branches,
        }
    }

    /// Width of the padded branch axis.
    pub const fn max_branches(&self) -> usize {
        self.max_branches
    }

    /// Number of sources.
    pub fn sources(&self) -> usize {
        self.per_source.len()
    }

    /// Branch set of a source.
    pub fn branches(&self, source: SourceId) -> Option<&BranchSet> {
        self.per_source.get(source.index())
    }

    /// The branch at `(source, branch)`, or `None` for padded slots.
    pub fn branch(&self, source: SourceId, branch: usize) -> Option<&Branch> {
        self.branches(source).and_then(|set| set.get(branch))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn branch_weights_are_normalised() {
        let set = BranchSet::new(&[(ModelId::new(0), 0.7), (ModelId::new(1), 0.305)]).unwrap();
        let sum: f64 = set.iter().map(|b| b.weight).sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn padded_slots_are_absent() {
        let tree = LogicTree::new(vec![
            BranchSet::new(&[(ModelId::new(0), 0.5), (ModelId::new(1), 0.5)]).unwrap(),
            BranchSet::single(ModelId::new(1)),
        ]);
        assert_eq!(tree.max_branches(), 2);
        assert!(tree.branch(SourceId::new(1), 1).is_none());
        assert_eq!(
            tree.branch(SourceId::new(1), 0).map(|b| b.model),
            Some(ModelId::new(1))
        );
    }
}
