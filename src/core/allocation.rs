//! Weight operations on the target allocation tree.
use crate::core::error::{AllocationError, Result};
use crate::core::taxonomy::{AllocationTree, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Relative tolerance used for every "sums to 1.0" check.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// `math.isclose` semantics: relative tolerance only, no absolute floor.
pub fn is_close(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= WEIGHT_TOLERANCE * a.abs().max(b.abs())
}

/// The granularity at which target weights are flattened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationLevel {
    /// First-tier categories, e.g. `US Equities`.
    AssetClass,
    /// Leaf tickers of a class → ticker taxonomy.
    Ticker,
}

impl AllocationLevel {
    pub fn max_depth(&self) -> usize {
        match self {
            AllocationLevel::AssetClass => 1,
            AllocationLevel::Ticker => 2,
        }
    }
}

/// One line of the tabular export of an allocation tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationRow {
    pub category: String,
    pub ticker: String,
    pub weight: f64,
}

impl Node<'_, f64> {
    /// Describes every internal node whose children's weights do not sum to
    /// 1.0. An empty list means the subtree is valid.
    pub fn validate_weights(&self) -> Vec<String> {
        if self.is_leaf() {
            return Vec::new();
        }

        let mut errors = Vec::new();
        let total: f64 = self.children().map(|child| child.weight()).sum();
        if !is_close(total, 1.0) {
            let parts: Vec<String> = self
                .children()
                .map(|child| format!("{} x {:?}", child.name(), child.weight()))
                .collect();
            errors.push(format!(
                "{} allocation must equal 1.0, {} == {:.4}, error == {:.4}",
                self.name(),
                parts.join(" + "),
                total,
                1.0 - total
            ));
        }
        for child in self.children() {
            errors.extend(child.validate_weights());
        }
        errors
    }

    /// Flattens the subtree into `(name, weight)` pairs.
    ///
    /// Recursion stops at leaves and at `max_depth`. Each level multiplies the
    /// returned weights by its own weight, so a call on the root with
    /// `current_depth == 0` yields effective portfolio weights. Weight held
    /// below the cutoff depth is not redistributed: the cutoff node reports
    /// its own local weight.
    pub fn collect_weights(&self, max_depth: usize, current_depth: usize) -> Vec<(String, f64)> {
        if self.is_leaf() || current_depth == max_depth {
            return vec![(self.name().to_string(), self.weight())];
        }
        let weight = self.weight();
        self.children()
            .flat_map(|child| child.collect_weights(max_depth, current_depth + 1))
            .map(|(name, child_weight)| (name, weight * child_weight))
            .collect()
    }

    pub fn weights_at(&self, level: AllocationLevel) -> Vec<(String, f64)> {
        self.collect_weights(level.max_depth(), 0)
    }

    pub fn ticker_weights(&self) -> Vec<(String, f64)> {
        self.weights_at(AllocationLevel::Ticker)
    }

    pub fn asset_class_weights(&self) -> Vec<(String, f64)> {
        self.weights_at(AllocationLevel::AssetClass)
    }

    /// Leaf name → immediate parent name. The root, if it is a leaf, is skipped.
    pub fn asset_class_mapping(&self) -> HashMap<String, String> {
        self.collect_leaves()
            .into_iter()
            .filter_map(|leaf| {
                leaf.parent()
                    .map(|parent| (leaf.name().to_string(), parent.name().to_string()))
            })
            .collect()
    }

    /// One row per leaf: parent category, leaf name and the leaf's ticker-level
    /// effective weight.
    pub fn to_rows(&self) -> Result<Vec<AllocationRow>> {
        let weights: HashMap<String, f64> = self.ticker_weights().into_iter().collect();
        self.collect_leaves()
            .into_iter()
            .map(|leaf| {
                let parent = leaf
                    .parent()
                    .ok_or_else(|| AllocationError::MissingParent(leaf.name().to_string()))?;
                let weight = weights
                    .get(leaf.name())
                    .copied()
                    .ok_or_else(|| AllocationError::MissingWeight(leaf.name().to_string()))?;
                Ok(AllocationRow {
                    category: parent.name().to_string(),
                    ticker: leaf.name().to_string(),
                    weight,
                })
            })
            .collect()
    }
}

impl AllocationTree {
    pub fn validate_weights(&self) -> Vec<String> {
        self.root().validate_weights()
    }

    /// Fails with every violation when the tree is not fit to drive analysis.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.validate_weights();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AllocationError::WeightSumMismatch(errors))
        }
    }

    pub fn collect_weights(&self, max_depth: usize, current_depth: usize) -> Vec<(String, f64)> {
        self.root().collect_weights(max_depth, current_depth)
    }

    pub fn weights_at(&self, level: AllocationLevel) -> Vec<(String, f64)> {
        self.root().weights_at(level)
    }

    pub fn ticker_weights(&self) -> Vec<(String, f64)> {
        self.root().ticker_weights()
    }

    pub fn asset_class_weights(&self) -> Vec<(String, f64)> {
        self.root().asset_class_weights()
    }

    pub fn asset_class_mapping(&self) -> HashMap<String, String> {
        self.root().asset_class_mapping()
    }

    pub fn to_rows(&self) -> Result<Vec<AllocationRow>> {
        self.root().to_rows()
    }
}
