//! Drift analysis: reconciles current holdings against target weights and
//! derives a buy/sell/hold action per category.
use crate::core::allocation::{AllocationLevel, is_close};
use crate::core::error::{AllocationError, Result};
use crate::core::taxonomy::AllocationTree;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::debug;

/// A current position reduced to the grouping key used for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRow {
    pub category: String,
    pub current_value: f64,
}

impl HoldingRow {
    pub fn new(category: impl Into<String>, current_value: f64) -> Self {
        Self {
            category: category.into(),
            current_value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// Strict sign test: only an exact zero holds.
    pub fn from_drift_value(drift_value: f64) -> Self {
        if drift_value < 0.0 {
            Action::Buy
        } else if drift_value > 0.0 {
            Action::Sell
        } else {
            Action::Hold
        }
    }

    /// Returns display name and emoji for the action
    pub fn display_info(&self) -> (&'static str, &'static str) {
        match self {
            Action::Buy => ("Buy", "🟢"),
            Action::Sell => ("Sell", "🔴"),
            Action::Hold => ("Hold", "⏸️"),
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_info().0)
    }
}

/// Per-category result of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftRow {
    pub category: String,
    pub current_value: f64,
    /// Fraction of the investable amount currently held.
    pub current_alloc: f64,
    /// Target fraction, 0 for categories missing from the targets.
    pub target_alloc: f64,
    pub target_pct: f64,
    /// `current_alloc - target_alloc`
    pub drift: f64,
    /// Currency amount above (positive) or below (negative) target.
    pub drift_value: f64,
    pub target_value: f64,
    pub action: Action,
}

/// Compares holdings with `targets`.
///
/// Holdings are summed per category and outer-joined with the targets, so
/// every category from either side appears exactly once. `cash_to_invest`
/// is added to the investable amount without belonging to any category.
/// Rows are ordered by category name.
pub fn analyze(
    holdings: &[HoldingRow],
    targets: &[(String, f64)],
    cash_to_invest: f64,
) -> Result<Vec<DriftRow>> {
    let alloc_sum: f64 = targets.iter().map(|(_, fraction)| fraction).sum();
    if !is_close(alloc_sum, 1.0) {
        return Err(AllocationError::InvalidTargetAllocation { sum: alloc_sum });
    }

    let mut current_by_category: BTreeMap<&str, f64> = BTreeMap::new();
    for row in holdings {
        *current_by_category.entry(row.category.as_str()).or_default() += row.current_value;
    }

    let investable = current_by_category.values().sum::<f64>() + cash_to_invest;
    // Targets sum to 1.0 here, so some category always needs a share of it.
    if investable == 0.0 {
        return Err(AllocationError::DivisionByZero);
    }
    debug!(investable, categories = current_by_category.len(), "Analyzing drift");

    let mut target_by_category: BTreeMap<&str, f64> = BTreeMap::new();
    for (category, fraction) in targets {
        *target_by_category.entry(category.as_str()).or_default() += fraction;
    }

    let categories: BTreeSet<&str> = current_by_category
        .keys()
        .chain(target_by_category.keys())
        .copied()
        .collect();

    let rows = categories
        .into_iter()
        .map(|category| {
            let current_value = current_by_category.get(category).copied().unwrap_or(0.0);
            let target_alloc = target_by_category.get(category).copied().unwrap_or(0.0);
            let current_alloc = current_value / investable;
            let drift_value = current_value - target_alloc * investable;
            DriftRow {
                category: category.to_string(),
                current_value,
                current_alloc,
                target_alloc,
                target_pct: target_alloc * 100.0,
                drift: current_alloc - target_alloc,
                drift_value,
                target_value: current_value - drift_value,
                action: Action::from_drift_value(drift_value),
            }
        })
        .collect();

    Ok(rows)
}

/// Validates `tree`, flattens it at `level` and runs [`analyze`].
pub fn analyze_against_tree(
    holdings: &[HoldingRow],
    tree: &AllocationTree,
    level: AllocationLevel,
    cash_to_invest: f64,
) -> Result<Vec<DriftRow>> {
    tree.ensure_valid()?;
    analyze(holdings, &tree.weights_at(level), cash_to_invest)
}
